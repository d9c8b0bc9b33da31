use crate::Result;
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};
use typed_builder::TypedBuilder;

const MYSQL_IMAGE: &str = "mysql";
const MYSQL_PORT: u16 = 3306;
const READY_MESSAGE: &str = "ready for connections";

/// Credentials and image tag of a throwaway MySQL server.
#[derive(Debug, Clone, TypedBuilder)]
pub struct MysqlConfig {
    #[builder(default = "shorturl".to_string(), setter(into))]
    database: String,
    #[builder(default = "shorturl".to_string(), setter(into))]
    user: String,
    #[builder(default = "shorturl".to_string(), setter(into))]
    password: String,
    #[builder(default = "8.4".to_string(), setter(into))]
    tag: String,
}

impl Default for MysqlConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// MySQL container holding the relational backend's table during a test.
///
/// The container is removed when this value is dropped, so keep it alive for
/// as long as the pool built from [`MySqlServer::dsn`] is in use.
pub struct MySqlServer {
    container: ContainerAsync<GenericImage>,
    config: MysqlConfig,
}

impl MySqlServer {
    pub async fn start(config: MysqlConfig) -> Result<Self> {
        let image = GenericImage::new(MYSQL_IMAGE, config.tag.as_str())
            .with_exposed_port(MYSQL_PORT.tcp())
            .with_wait_for(WaitFor::message_on_stderr(READY_MESSAGE));
        let container = image
            .with_env_var("MYSQL_ROOT_PASSWORD", config.password.as_str())
            .with_env_var("MYSQL_DATABASE", config.database.as_str())
            .with_env_var("MYSQL_USER", config.user.as_str())
            .with_env_var("MYSQL_PASSWORD", config.password.as_str())
            .start()
            .await?;

        Ok(Self { container, config })
    }

    /// sqlx DSN for the mapped host port.
    pub async fn dsn(&self) -> Result<String> {
        let host = self.container.get_host().await?;
        let port = self.container.get_host_port_ipv4(MYSQL_PORT).await?;
        let MysqlConfig {
            database,
            user,
            password,
            ..
        } = &self.config;
        Ok(format!("mysql://{user}:{password}@{host}:{port}/{database}"))
    }
}
