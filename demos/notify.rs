use anyhow::Result;
use dbus_stream::notifications::{self, Notification};
use dbus_stream::{org_freedesktop_dbus, Client, Message, Type, Value};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut c = Client::session_bus().await?;
    dbg!(c.connection().unique_name());

    let rule = format!("type='signal',interface='{}'", notifications::INTERFACE);
    let add_match = org_freedesktop_dbus::add_match(c.connection_mut(), &rule)?;
    c.wait(&add_match).await?;

    c.connection_mut()
        .listen_for_signal(Some(notifications::INTERFACE), |m: &Message| {
            dbg!(m.member(), m.body());
        });

    let call = Notification::new("Hello from dbus-stream")
        .app_name("notify")
        .body("Sent over a raw unix socket")
        .hint("urgency", Type::Byte, Value::Byte(1))
        .expire_timeout(3000)
        .send(c.connection_mut())?;

    let reply = c.wait(&call).await?;
    let id = notifications::notification_id(&reply);
    dbg!(id);

    // Print signals such as `NotificationClosed` until interrupted.
    loop {
        c.process().await?;
    }
}
