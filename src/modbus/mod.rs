pub mod codec;
pub mod session;
pub mod tcp;

pub use codec::{decode_registers, encode_value};
pub use session::{RegisterSession, SessionFactory};
pub use tcp::TcpSessionFactory;
