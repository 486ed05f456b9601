//! Contract interfaces used by the vault session.

use alloy_sol_types::sol;

sol! {
    interface IERC20 {
        function balanceOf(address owner) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function allowance(address owner, address spender) external view returns (uint256);
        function decimals() external view returns (uint8);
        function symbol() external view returns (string);
    }

    /// Custodial vault. Balances of the native coin are keyed by the zero address.
    interface IVault {
        function depositNative() external payable;
        function depositToken(address token, uint256 amount) external;
        function withdrawNative(uint256 amount) external;
        function withdrawToken(address token, uint256 amount) external;
        function transferInternalNative(address to, uint256 amount) external;
        function transferInternalToken(address token, address to, uint256 amount) external;
        function depositMultipleTokens(address[] tokens, uint256[] amounts) external;
        function withdrawMultipleTokens(address[] tokens, uint256[] amounts) external;
        function transferMultipleTokensInternal(
            address to,
            address[] tokens,
            uint256[] amounts
        ) external;
        function balanceOf(address user, address token) external view returns (uint256);
        function getCurrentFee() external view returns (uint256);
        function getMyVaultedTokens(address user)
            external
            view
            returns (address[] memory tokens, uint256[] memory amounts);
    }
}
