#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_maxage: i64,
    pub storage_url: String,
    pub storage_service_key: String,
    pub storage_bucket: String,
    pub port: u16,
    pub frontend_url: String,
}

impl Config {
    pub fn init() -> Config {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let jwt_secret = std::env::var("JWT_SECRET_KEY").expect("JWT_SECRET_KEY must be set");
        let jwt_maxage = std::env::var("JWT_MAXAGE").expect("JWT_MAXAGE must be set");
        let storage_url = std::env::var("STORAGE_URL").expect("STORAGE_URL must be set");
        let storage_service_key =
            std::env::var("STORAGE_SERVICE_KEY").expect("STORAGE_SERVICE_KEY must be set");
        let storage_bucket = std::env::var("STORAGE_BUCKET").expect("STORAGE_BUCKET must be set");
        let frontend_url = std::env::var("FRONTEND_URL").expect("FRONTEND_URL must be set");

        Config {
            database_url,
            jwt_secret,
            jwt_maxage: jwt_maxage.parse::<i64>().unwrap(),
            storage_url,
            storage_service_key,
            storage_bucket,
            port: 8000,
            frontend_url,
        }
    }
}
