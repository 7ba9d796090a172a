mod http;
mod kv;

pub use self::http::{into_empty_result, into_json_result, Backend};
pub use self::kv::{CacheKey, KvError, MAX_VALUE_SIZE};

pub use crux_core::render::Render;
pub use crux_http::Http;
pub use crux_kv::KeyValue;

use crate::app::App;
use crate::event::Event;

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub http: Http<Event>,
    pub kv: KeyValue<Event>,
    pub render: Render<Event>,
}
