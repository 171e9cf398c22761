mod astronomer_api_tests;
mod auth_api_tests;
mod body_api_tests;
mod observation_api_tests;
