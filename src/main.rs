mod app;
mod logging;
mod model;
mod nav;
mod page;
mod services;
mod theme;
mod ui;
mod widgets;

use anyhow::Result;

fn main() -> Result<()> {
    ui::run()
}
