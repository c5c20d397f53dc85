use actix_web::web;

pub mod barber;
pub mod public;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.configure(public::configure).configure(barber::configure);
}
