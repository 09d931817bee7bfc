pub mod sslcommerz_client;
