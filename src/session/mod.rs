pub mod auth;

pub mod auth_helper;

pub mod interface;

pub mod logout;
