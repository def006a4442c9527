//! Truffle Token and Faucet contract ABI definitions
//!
//! Uses alloy's sol! macro to generate type-safe bindings for the two
//! contracts the dashboard talks to: the Truffle ERC20 token (standard
//! surface plus owner-gated mint/burn) and the time-gated faucet.
//!
//! The faucet reverts with custom errors rather than string reasons; the
//! error declarations here match the deployed contract and back the fixed
//! selector table in [`crate::errors`].

use alloy::sol;

sol! {
    /// Truffle token contract interface (ERC20 plus owner-gated supply ops)
    #[sol(rpc)]
    contract TruffleToken {
        // ========================================================================
        // View Functions
        // ========================================================================

        /// Token name
        function name() external view returns (string);

        /// Token symbol
        function symbol() external view returns (string);

        /// Decimal places for display scaling
        function decimals() external view returns (uint8);

        /// Total token supply in base units
        function totalSupply() external view returns (uint256);

        /// Balance of an account in base units
        function balanceOf(address account) external view returns (uint256);

        /// Remaining allowance from tokenOwner to spender
        function allowance(address tokenOwner, address spender) external view returns (uint256);

        /// Contract owner (mint/burn authority)
        function owner() external view returns (address);

        // ========================================================================
        // Write Functions
        // ========================================================================

        /// Transfer tokens to another account
        function transfer(address to, uint256 amount) external returns (bool);

        /// Approve a spender for an exact allowance
        function approve(address spender, uint256 amount) external returns (bool);

        /// Transfer tokens using a previously granted allowance
        function transferFrom(address from, address to, uint256 amount) external returns (bool);

        /// Raise a spender's allowance
        function increaseAllowance(address spender, uint256 addedValue) external returns (bool);

        /// Lower a spender's allowance
        function decreaseAllowance(address spender, uint256 subtractedValue) external returns (bool);

        /// Mint new tokens to an account (owner only)
        function mint(address to, uint256 amount) external;

        /// Burn tokens from an account (owner only)
        function burn(address account, uint256 amount) external;

        /// Burn tokens from an account using the caller's allowance
        function burnFrom(address account, uint256 amount) external;

        /// Hand contract ownership to a new address (owner only)
        function transferOwnership(address newOwner) external;

        // ========================================================================
        // Events
        // ========================================================================

        event Transfer(address indexed from, address indexed to, uint256 value);
        event Approval(address indexed owner, address indexed spender, uint256 value);
        event OwnershipTransferred(address indexed previousOwner, address indexed newOwner);
    }

    /// Faucet contract interface - dispenses a fixed claim amount per
    /// address, gated by a cooldown
    #[sol(rpc)]
    contract TokenFaucet {
        // ========================================================================
        // View Functions
        // ========================================================================

        /// Amount dispensed per claim, in base units
        function claimAmount() external view returns (uint256);

        /// Minimum seconds between claims by the same address
        function cooldown() external view returns (uint256);

        /// Token balance the faucet still holds, in base units
        function faucetBalance() external view returns (uint256);

        /// Unix timestamp of the last claim by an address (0 = never claimed)
        function lastClaim(address user) external view returns (uint256);

        /// Faucet owner (withdraw authority)
        function owner() external view returns (address);

        /// Address of the token the faucet dispenses
        function token() external view returns (address);

        // ========================================================================
        // Write Functions
        // ========================================================================

        /// Claim the fixed token amount for the caller
        function claim() external;

        /// Withdraw tokens back out of the faucet (owner only)
        function withdrawTokens(uint256 amount) external;

        /// Hand faucet ownership to a new address (owner only)
        function transferOwnership(address newOwner) external;

        // ========================================================================
        // Events
        // ========================================================================

        event Claimed(address indexed user, uint256 amount);
        event TokensWithdrawn(address indexed to, uint256 amount);
        event OwnershipTransferred(address indexed previousOwner, address indexed newOwner);

        // ========================================================================
        // Custom Errors
        // ========================================================================

        /// Claim attempted before the cooldown elapsed; carries the unix
        /// timestamp at which the next claim becomes available
        error CooldownActive(uint256 nextClaimTimestamp);

        /// Faucet does not hold enough tokens for one claim
        error InsufficientFaucetBalance();

        /// Caller is not the contract owner
        error NotOwner();

        /// The underlying ERC20 transfer returned false
        error TransferFailed();

        /// An address parameter was the zero address
        error ZeroAddress();
    }
}
