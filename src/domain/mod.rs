pub mod bitrate;
pub mod connection;
pub mod demand;
pub mod fiber;
pub mod link;
pub mod network;
pub mod node;
pub mod p2p;
pub mod route;
