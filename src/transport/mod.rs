// MIT License - Copyright (c) 2026 Peter Wright
// TCP transport to the controller

pub mod command;
pub mod direct;

pub use command::CommandSender;
pub use direct::TcpTransport;
