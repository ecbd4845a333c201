//! SSH transport to review servers.
//!
//! Both adapters drive the system `ssh` client, so authentication follows the
//! usual OpenSSH rules (agent, `~/.ssh/config`, or the configured key).

mod args;
mod channel;
mod feed;

pub use channel::SshCommandChannel;
pub use feed::SshEventFeed;
