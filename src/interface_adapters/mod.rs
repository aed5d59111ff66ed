// Interface adapters: wire protocol, network handling and storage.

pub mod game_data;
pub mod http;
pub mod net;
pub mod protocol;
pub mod routes;
pub mod state;
pub mod stores;
pub mod utils;
