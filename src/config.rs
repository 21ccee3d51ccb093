use std::{env, net::SocketAddr, path::PathBuf};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DB_PATH: &str = "huellacarbono.db";
const DEFAULT_LOGO_PATH: &str = "huellac.png";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub db_path: PathBuf,
    pub logo_path: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        Self {
            port,
            db_path: path_from_env("APP_DB_PATH", DEFAULT_DB_PATH),
            logo_path: path_from_env("APP_LOGO_PATH", DEFAULT_LOGO_PATH),
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

fn path_from_env(key: &str, default: &str) -> PathBuf {
    match env::var(key) {
        Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
        _ => PathBuf::from(default),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Centered,
    Wide,
}

/// Fixed page chrome.
#[derive(Debug, Clone, Copy)]
pub struct PageConfig {
    pub title: &'static str,
    pub icon: &'static str,
    pub layout: Layout,
    pub sidebar_expanded: bool,
    pub sidebar_title: &'static str,
    pub nav_prompt: &'static str,
    pub footer: &'static str,
}

pub const PAGE: PageConfig = PageConfig {
    title: "Huella de Carbono",
    icon: "🌍",
    layout: Layout::Wide,
    sidebar_expanded: true,
    sidebar_title: "Menú de Navegación",
    nav_prompt: "Selecciona una vista:",
    footer: "🌍 Reduce tu huella de carbono",
};
