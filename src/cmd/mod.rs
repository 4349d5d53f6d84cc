//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module   | Commands handled                     |
//! |----------|--------------------------------------|
//! | `auth`   | `Auth`                               |
//! | `boards` | `Boards`                             |
//! | `board`  | `Board`                              |
//! | `demo`   | `Demo`                               |

pub mod auth;
pub mod board;
pub mod boards;
pub mod demo;

pub use auth::cmd_auth;
pub use board::cmd_board;
pub use boards::cmd_boards;
pub use demo::cmd_demo;

use taskboard::board::BoardStore;

/// Turn a failure the store recorded into a command error.
fn ensure_ok(store: &BoardStore) -> anyhow::Result<()> {
    match store.state().error {
        Some(message) => anyhow::bail!(message),
        None => Ok(()),
    }
}
