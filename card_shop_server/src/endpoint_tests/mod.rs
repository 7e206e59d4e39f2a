mod admin;
mod helpers;
mod payments;
mod storefront;
