use serde::Serialize;

/// Tracked state of one async operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "lowercase")]
pub enum AsyncStatus<T> {
    #[default]
    Idle,
    Loading,
    Ok(T),
    Err(String),
}

/// One step of a thunk's lifecycle, as carried by an action.
#[derive(Debug, Clone, PartialEq)]
pub enum Phase<T> {
    Pending,
    Fulfilled(T),
    Rejected(String),
}

impl<T> AsyncStatus<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Ok(v) => Some(v),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Err(e) => Some(e),
            _ => None,
        }
    }
}

impl<T: Clone> AsyncStatus<T> {
    /// Move to the status a phase implies.
    pub fn apply(&mut self, phase: &Phase<T>) {
        *self = match phase {
            Phase::Pending => Self::Loading,
            Phase::Fulfilled(v) => Self::Ok(v.clone()),
            Phase::Rejected(e) => Self::Err(e.clone()),
        };
    }
}

impl<T> Phase<T> {
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Rejected(e) => Some(e),
            _ => None,
        }
    }

    /// Loading flag and error field after this phase: pending sets loading
    /// and clears the error, the other two clear loading.
    pub fn flags(&self) -> (bool, Option<String>) {
        match self {
            Self::Pending => (true, None),
            Self::Fulfilled(_) => (false, None),
            Self::Rejected(e) => (false, Some(e.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle() {
        let mut status: AsyncStatus<u32> = AsyncStatus::default();
        assert_eq!(status, AsyncStatus::Idle);

        status.apply(&Phase::Pending);
        assert!(status.is_loading());

        status.apply(&Phase::Fulfilled(7));
        assert_eq!(status.value(), Some(&7));

        status.apply(&Phase::Rejected("boom".into()));
        assert_eq!(status.error(), Some("boom"));
        assert_eq!(status.value(), None);
    }

    #[test]
    fn phase_flags() {
        assert_eq!(Phase::<()>::Pending.flags(), (true, None));
        assert_eq!(Phase::Fulfilled(1).flags(), (false, None));
        assert_eq!(
            Phase::<()>::Rejected("x".into()).flags(),
            (false, Some("x".to_string()))
        );
    }

    #[test]
    fn serializes_tagged() {
        let json = serde_json::to_value(AsyncStatus::Ok(3)).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "ok", "value": 3 }));
    }
}
