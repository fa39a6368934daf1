mod config;
mod coordinated_writes;
mod score_sync;
