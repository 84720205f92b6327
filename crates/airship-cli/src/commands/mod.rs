pub mod db;
pub mod release;
pub mod seed;
