//! Shared test utilities for the workspace.

pub use zkb_core::base::{Address, Field};

/// Helper macro to create a field element with a specific last byte.
#[macro_export]
macro_rules! field {
    ($v:expr) => {{
        let mut arr = [0_u8; 32];
        arr[31] = $v;
        $crate::Field::from(arr)
    }};
}

/// Helper macro to create a vector of field elements, keeping the given order.
#[macro_export]
macro_rules! fields {
    ($($v:expr),* $(,)?) => {{
        vec![$( $crate::field!($v) ),*]
    }};
}

/// Helper macro to create an address with a specific last byte.
#[macro_export]
macro_rules! address {
    ($v:expr) => {
        $crate::Address::from_tag($v)
    };
}
