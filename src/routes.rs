use crate::{
    api::{attendance_import, edit_request, stats},
    config::Config,
};
use actix_web::web;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    cfg.service(
        web::scope(&config.api_prefix).service(
            web::scope("/attendance")
                .service(
                    web::resource("/import")
                        .route(web::post().to(attendance_import::import)),
                )
                .service(
                    web::resource("/import/detect-period")
                        .route(web::post().to(attendance_import::detect_period)),
                )
                .service(
                    web::resource("/import/check-overlap")
                        .route(web::get().to(attendance_import::check_overlap)),
                )
                .service(
                    web::resource("/import/template")
                        .route(web::get().to(attendance_import::template)),
                )
                .service(
                    web::resource("/imports")
                        .route(web::get().to(attendance_import::list_imports)),
                )
                .service(
                    web::resource("/imports/{import_id}")
                        .route(web::get().to(attendance_import::get_import)),
                )
                .service(
                    web::resource("/edit-requests")
                        .route(web::post().to(edit_request::create)),
                )
                .service(
                    web::resource("/edit-requests/{request_id}/approve")
                        .route(web::put().to(edit_request::approve)),
                )
                .service(
                    web::resource("/edit-requests/{request_id}/reject")
                        .route(web::put().to(edit_request::reject)),
                )
                .service(web::resource("/stats").route(web::get().to(stats::stats))),
        ),
    );
}
