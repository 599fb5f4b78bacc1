//! Contract interfaces used for calldata encoding, plus the JSON ABIs
//! stored alongside deployed contract records.

use alloy_sol_types::sol;

sol! {
    interface IERC20 {
        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function totalSupply() external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
        function transfer(address to, uint256 amount) external returns (bool);
    }

    interface IERC721Mint {
        function mint(address to, string tokenURI) external returns (uint256);
        function ownerOf(uint256 tokenId) external view returns (address);
    }
}

fn function(name: &str, inputs: serde_json::Value, outputs: serde_json::Value, mutability: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "function",
        "name": name,
        "inputs": inputs,
        "outputs": outputs,
        "stateMutability": mutability
    })
}

/// ABI of the ERC-20 token deployed by the wallet.
pub fn erc20_abi() -> Vec<serde_json::Value> {
    use serde_json::json;
    vec![
        json!({
            "type": "constructor",
            "inputs": [
                { "name": "name_", "type": "string" },
                { "name": "symbol_", "type": "string" },
                { "name": "decimals_", "type": "uint8" },
                { "name": "totalSupply_", "type": "uint256" }
            ],
            "stateMutability": "nonpayable"
        }),
        function("name", json!([]), json!([{ "name": "", "type": "string" }]), "view"),
        function("symbol", json!([]), json!([{ "name": "", "type": "string" }]), "view"),
        function("decimals", json!([]), json!([{ "name": "", "type": "uint8" }]), "view"),
        function("totalSupply", json!([]), json!([{ "name": "", "type": "uint256" }]), "view"),
        function(
            "balanceOf",
            json!([{ "name": "account", "type": "address" }]),
            json!([{ "name": "", "type": "uint256" }]),
            "view",
        ),
        function(
            "transfer",
            json!([{ "name": "to", "type": "address" }, { "name": "amount", "type": "uint256" }]),
            json!([{ "name": "", "type": "bool" }]),
            "nonpayable",
        ),
        function(
            "approve",
            json!([{ "name": "spender", "type": "address" }, { "name": "amount", "type": "uint256" }]),
            json!([{ "name": "", "type": "bool" }]),
            "nonpayable",
        ),
        function(
            "transferFrom",
            json!([
                { "name": "from", "type": "address" },
                { "name": "to", "type": "address" },
                { "name": "amount", "type": "uint256" }
            ]),
            json!([{ "name": "", "type": "bool" }]),
            "nonpayable",
        ),
    ]
}

/// ABI of the mintable ERC-721 collection deployed by the wallet.
pub fn erc721_abi() -> Vec<serde_json::Value> {
    use serde_json::json;
    vec![
        json!({
            "type": "constructor",
            "inputs": [
                { "name": "name_", "type": "string" },
                { "name": "symbol_", "type": "string" },
                { "name": "baseURI_", "type": "string" }
            ],
            "stateMutability": "nonpayable"
        }),
        function("name", json!([]), json!([{ "name": "", "type": "string" }]), "view"),
        function("symbol", json!([]), json!([{ "name": "", "type": "string" }]), "view"),
        function(
            "balanceOf",
            json!([{ "name": "owner", "type": "address" }]),
            json!([{ "name": "", "type": "uint256" }]),
            "view",
        ),
        function(
            "ownerOf",
            json!([{ "name": "tokenId", "type": "uint256" }]),
            json!([{ "name": "", "type": "address" }]),
            "view",
        ),
        function(
            "tokenURI",
            json!([{ "name": "tokenId", "type": "uint256" }]),
            json!([{ "name": "", "type": "string" }]),
            "view",
        ),
        function(
            "mint",
            json!([{ "name": "to", "type": "address" }, { "name": "tokenURI", "type": "string" }]),
            json!([{ "name": "", "type": "uint256" }]),
            "nonpayable",
        ),
        function(
            "safeTransferFrom",
            json!([
                { "name": "from", "type": "address" },
                { "name": "to", "type": "address" },
                { "name": "tokenId", "type": "uint256" }
            ]),
            json!([]),
            "nonpayable",
        ),
    ]
}
