pub mod images_list_service;

pub mod profile_service;
