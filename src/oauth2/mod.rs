// ABOUTME: OAuth 2.0 / OIDC authorization server module
// ABOUTME: Client registration, grant engine, token exchange, introspection, discovery
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LUKHAS AI

/// RFC 7591 dynamic client registration and client credential validation
pub mod client_registration;
/// OIDC discovery metadata and JWKS serving
pub mod discovery;
/// Authorization, token, introspection, and userinfo operations
pub mod endpoints;
/// OAuth 2.0 data models and request/response types
pub mod models;

pub use client_registration::{ClientRegistrationManager, ProvisionClientParams};

pub use discovery::{DiscoveryDocument, DiscoveryService};

/// OAuth 2.0 authorization server
pub use endpoints::AuthorizationServer;

/// Authorization request
pub use models::AuthorizeRequest;
/// Authorization response
pub use models::AuthorizeResponse;
/// Client registration request
pub use models::ClientRegistrationRequest;
/// Client registration response
pub use models::ClientRegistrationResponse;
/// Token introspection response
pub use models::IntrospectionResponse;
/// OAuth 2.0 error response
pub use models::OAuth2Error;
/// Registered client record
pub use models::OAuthClient;
/// Token exchange request
pub use models::TokenRequest;
/// Token exchange response
pub use models::TokenResponse;
/// UserInfo claims response
pub use models::UserInfoResponse;
