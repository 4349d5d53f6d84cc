//! Kanban board client: boards, lists and cards kept in sync with a hosted
//! data platform.
//!
//! | Module   | Purpose                                                      |
//! |----------|--------------------------------------------------------------|
//! | `auth`   | Signed-in user tracking, session events, profile mirroring   |
//! | `board`  | Models, position ordering, and the `BoardStore`              |
//! | `config` | Platform URL, anon key and session file from the environment |
//! | `errors` | Typed errors for the remote, auth and config seams           |
//! | `remote` | `RemoteStore` / `AuthClient` traits and their two backends   |
//! | `ui`     | Terminal rendering                                           |

pub mod auth;
pub mod board;
pub mod config;
pub mod errors;
pub mod remote;
pub mod ui;
