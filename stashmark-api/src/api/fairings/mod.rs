pub mod db;
pub mod fetcher;
