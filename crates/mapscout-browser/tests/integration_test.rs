use mapscout_browser::{BrowserContext, BrowserLauncher, ChromiumLauncher, PageDriver};
use mapscout_core::BrowserConfig;
use std::time::Duration;

const PAGE: &str = "data:text/html,<div role='feed'><div>a</div><div>b</div></div>\
<h1 class='DUwDvf'>Botica Central</h1>\
<button data-item-id='address' aria-label='Dirección: Av. Principal 123'></button>";

#[tokio::test]
#[ignore] // Requires Chrome/Chromium installed
async fn test_browser_launch_and_shutdown() {
    let launcher = ChromiumLauncher::new(BrowserConfig::default());
    let context = launcher.launch(true).await;
    assert!(context.is_ok(), "Failed to launch browser");
    context.unwrap().shutdown().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires Chrome/Chromium installed
async fn test_tab_reads() {
    let launcher = ChromiumLauncher::new(BrowserConfig::default());
    let context = launcher.launch(true).await.unwrap();
    let tab = context.open_tab().await.unwrap();

    tab.navigate(PAGE, Duration::from_secs(10)).await.unwrap();
    tab.wait_for_selector(r#"div[role="feed"]"#, Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(tab.count_elements(r#"div[role="feed"] > div"#).await.unwrap(), 2);

    let name = tab.get_text("h1.DUwDvf", Duration::from_secs(2)).await.unwrap();
    assert_eq!(name.as_deref(), Some("Botica Central"));

    let label = tab
        .get_attribute(
            r#"button[data-item-id="address"]"#,
            "aria-label",
            Duration::from_secs(2),
        )
        .await
        .unwrap();
    assert_eq!(label.as_deref(), Some("Dirección: Av. Principal 123"));

    let missing = tab.get_text("h2.nothing", Duration::from_millis(300)).await;
    assert!(missing.unwrap_err().is_absence());

    tab.close().await.unwrap();
    context.shutdown().await.unwrap();
}
