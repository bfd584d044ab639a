use crate::server::ServerRouter;

mod files;
mod pages;
mod posts;
mod users;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .merge(pages::routes())
        .merge(posts::routes())
        .merge(users::routes())
        .merge(files::routes())
}
