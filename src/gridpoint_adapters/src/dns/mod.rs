pub mod static_mx_resolver;

pub use static_mx_resolver::StaticMxResolver;
