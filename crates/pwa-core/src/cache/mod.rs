//! Cache interception module

mod fallback;
mod interceptor;

pub use fallback::FallbackKind;
pub use interceptor::{ActivationReport, CacheInterceptor, Interception, InterceptorStats};
