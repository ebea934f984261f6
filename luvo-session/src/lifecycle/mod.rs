pub mod call;
pub mod interaction;
pub mod keygen;
pub mod stream;
pub mod window;
