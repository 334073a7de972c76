//! External service integrations

pub mod mailchimp;
