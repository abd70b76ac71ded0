mod auth;
mod codec;
mod decimal;
mod macros;
