//! Realtime synchronization core for RetroQuest boards.
//!
//! ## Module Map
//!
//! | Module         | Responsibility                                             |
//! |----------------|------------------------------------------------------------|
//! | `items`        | `Thought`, `ActionItem`, `Column` and the `Item` trait     |
//! | `bus`          | `TopicBus` incoming/outgoing fan-out, one per item type    |
//! | `destination`  | Team normalization and STOMP topic/app paths               |
//! | `stomp`        | Frame codec and the tokio-tungstenite session              |
//! | `realtime`     | `RealtimeAdapter` bridging buses and the STOMP session     |
//! | `lifecycle`    | `SyncSession` reacting to login and foreground events      |
//! | `store`        | Sorted local collections fed from a bus                    |
//! | `fetch`        | HTTP initial load published onto the buses                 |
//! | `urls`         | Base URL normalization and derived endpoints               |
//! | `credentials`  | Cookie jar and `TokenStore` lookup                         |
//! | `retro_config` | `retroquest.toml` with env and CLI layering                |
//! | `logging`      | tracing-subscriber setup                                   |
//! | `errors`       | `SyncError`, `FrameError`                                  |

pub mod bus;
pub mod credentials;
pub mod destination;
pub mod errors;
pub mod fetch;
pub mod items;
pub mod lifecycle;
pub mod logging;
pub mod realtime;
pub mod retro_config;
pub mod stomp;
pub mod store;
pub mod urls;
