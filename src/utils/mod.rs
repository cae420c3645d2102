pub mod zone_cache;
