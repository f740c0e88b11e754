pub mod frame;
pub mod message;
pub mod reader;
pub mod server;
pub mod writer;

pub use frame::Frame;
pub use message::{decode_batch, encode_clusters};
pub use reader::FramedAsyncBufferedReader;
pub use server::Server;
pub use writer::FramedAsyncBufferedWriter;
