//! The application's route URIs.

/// The root route which redirects to the dashboard or log in page.
pub const ROOT: &str = "/";
/// The landing page for logged in users.
pub const DASHBOARD: &str = "/dashboard";
/// The page listing a user's operations, and the route for recording one.
pub const OPERATIONS: &str = "/operations";
/// The route for sending money to another account.
pub const TRANSFERS: &str = "/transfers";
/// The page listing a user's categories, and the route for creating one.
pub const CATEGORIES: &str = "/categories";
/// The route for changing a category's spending limit.
pub const CATEGORY_LIMIT: &str = "/categories/limit";
/// The route for deleting a category.
pub const DELETE_CATEGORY: &str = "/categories/delete";
/// The route for getting the log in page and logging in a user.
pub const LOG_IN: &str = "/log_in";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/log_out";
/// The route for getting the registration page.
pub const REGISTER: &str = "/register";
/// The route for registering new users.
pub const USERS: &str = "/users";
