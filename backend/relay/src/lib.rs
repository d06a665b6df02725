pub mod providers;

pub use providers::assistants::{AssistantsApi, AssistantsRelay, RemoteRun};
pub use providers::assistants_http::HttpAssistantsApi;
pub use providers::chat::ChatCompletionsRelay;
pub use providers::echo::EchoRelay;
pub use providers::{build_relay, RelaySettings};
