//! Message-context helpers shared by the crate-local error types.
//!
//! Each crate keeps its own `Error` enum; this module only supplies the glue
//! that turns a failure plus a short description into that enum.

/// An error type that can carry a bare message.
pub trait FromMessage: Sized {
    fn from_message(message: String) -> Self;
}

/// Expands to a `Context` trait adding `.context()` and `.with_context()` to
/// `Result` and `Option`, producing the surrounding module's `Error`.
///
/// The calling module must have `Error: FromMessage` and a
/// `Result<T>` alias in scope.
///
/// ```ignore
/// // in crates/store/src/error.rs
/// hourbell_common::impl_context!();
/// ```
#[macro_export]
macro_rules! impl_context {
    () => {
        pub trait Context<T>: Sized {
            fn with_context<C, F>(self, describe: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C;

            fn context(self, description: impl Into<String>) -> Result<T> {
                self.with_context(|| description)
            }
        }

        impl<T, E: std::fmt::Display> Context<T> for std::result::Result<T, E> {
            fn with_context<C, F>(self, describe: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C,
            {
                self.map_err(|cause| {
                    let message = format!("{}: {cause}", describe().into());
                    <Error as $crate::FromMessage>::from_message(message)
                })
            }
        }

        impl<T> Context<T> for Option<T> {
            fn with_context<C, F>(self, describe: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C,
            {
                self.ok_or_else(|| <Error as $crate::FromMessage>::from_message(describe().into()))
            }
        }
    };
}
