//! Solidity interface definitions for on-chain interactions.

use alloy_sol_types::sol;

sol! {
    /// Minimal ERC-20 interface: metadata, balance and transfer.
    #[allow(missing_docs)]
    #[derive(Debug)]
    #[sol(rpc)]
    interface IERC20 {
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function balanceOf(address account) external view returns (uint256);
        function transfer(address to, uint256 amount) external returns (bool);
    }
}
