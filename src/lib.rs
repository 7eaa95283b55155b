/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Client for a public photo-sharing REST API.
//!
//! [`session::auth::OAuth2Service`] turns an authorization code into a bearer
//! token kept by a [`storage::token_store::TokenStore`].
//! [`application::services::images_list_service::ImagesListService`] pages
//! through the photo feed and toggles likes, announcing every change on a
//! broadcast channel.

pub mod config;

pub(crate) mod constants;

pub mod error;

pub mod application;

pub mod session;

pub mod storage;

pub mod transport;

pub mod utils;

#[cfg(test)]
mod test_support;
