pub mod admin;
pub mod artifacts;
pub mod audits;
pub mod deployments;
pub mod health;
pub mod projects;
pub mod webhook;

#[cfg(test)]
mod test_support;
