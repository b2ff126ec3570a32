//! Solidity interfaces used by discovery, quoting and execution.

use alloy_sol_types::sol;

// ============================================
// FACTORIES
// ============================================

sol! {
    #[derive(Debug)]
    interface IV3Factory {
        function getPool(address tokenA, address tokenB, uint24 fee)
            external view returns (address pool);
    }

    #[derive(Debug)]
    interface IV2Factory {
        function getPair(address tokenA, address tokenB)
            external view returns (address pair);
    }
}

// ============================================
// POOL INTERFACES
// ============================================

sol! {
    #[derive(Debug)]
    interface IV3Pool {
        function slot0() external view returns (
            uint160 sqrtPriceX96, int24 tick, uint16 observationIndex,
            uint16 observationCardinality, uint16 observationCardinalityNext,
            uint32 feeProtocol, bool unlocked
        );
        function liquidity() external view returns (uint128);
        function token0() external view returns (address);
        function token1() external view returns (address);
        function fee() external view returns (uint24);
    }

    #[derive(Debug)]
    interface IV2Pair {
        function getReserves() external view returns (uint112 reserve0, uint112 reserve1, uint32 blockTimestampLast);
        function token0() external view returns (address);
        function token1() external view returns (address);
    }
}

// ============================================
// ROUTERS & QUOTERS
// ============================================

sol! {
    /// Smart router: V2 + V3 swaps in one contract, batched via multicall
    #[derive(Debug)]
    interface ISmartRouter {
        struct ExactInputParams {
            bytes path;
            address recipient;
            uint256 amountIn;
            uint256 amountOutMinimum;
        }

        function exactInput(ExactInputParams calldata params)
            external payable returns (uint256 amountOut);

        function swapExactTokensForTokens(
            uint256 amountIn,
            uint256 amountOutMin,
            address[] calldata path,
            address to
        ) external payable returns (uint256 amountOut);

        function multicall(uint256 deadline, bytes[] calldata data)
            external payable returns (bytes[] memory results);
    }

    #[derive(Debug)]
    interface IV2Router {
        function getAmountsOut(uint256 amountIn, address[] calldata path)
            external view returns (uint256[] memory amounts);
    }

    /// Quoter for paths mixing V2 and V3 hops. `flag[i]` is 0 for V3, 1 for V2.
    #[derive(Debug)]
    interface IMixedRouteQuoter {
        function quoteExactInput(bytes memory path, uint256[] memory flag, uint256 amountIn)
            external returns (
                uint256 amountOut,
                uint160[] memory v3SqrtPriceX96AfterList,
                uint32[] memory v3InitializedTicksCrossedList,
                uint256 v3SwapGasEstimate
            );
    }
}

// ============================================
// ERC-20
// ============================================

sol! {
    #[derive(Debug)]
    interface IERC20 {
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }
}
