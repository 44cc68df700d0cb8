// Gateway configuration (environment-driven)
pub mod config;

// Webex REST API client
pub mod webex;

// Email domain allow-list
pub mod auth;

// Server-side session store and cookie handling
pub mod session;

// Append-only activity ledger
pub mod ledger;

// HTTP API routers
pub mod api;
