pub mod bid;
