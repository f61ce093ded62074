/// Popup UI for Site Timer

use yew::prelude::*;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use patternfly_yew::prelude::*;
use crate::background::ChromeStore;
use crate::clock::{Clock, SystemClock};
use crate::config::{PopupConfig, TrackerConfig};
use crate::site_info::SiteInfo;
use crate::stats::{
    chart_slices, format_duration, slice_percentages, sort_usage, usage_for, Category, Paginator, SortKey,
    SortOrder,
};
use crate::store::SiteInfoStore;

// Import JS bridge functions
#[wasm_bindgen(module = "/popup.js")]
extern "C" {
    fn connectTracker();

    #[wasm_bindgen(catch)]
    async fn requestFlush() -> Result<JsValue, JsValue>;
}

#[derive(Clone, PartialEq)]
enum AppState {
    Loading,
    Ready(SiteInfo),
    Error,
}

#[function_component(App)]
pub fn app() -> Html {
    let state = use_state(|| AppState::Loading);
    let popup_config = use_state(PopupConfig::default);
    let category = use_state(|| Category::Today);
    let sort_key = use_state(|| SortKey::Time);
    let sort_order = use_state(|| SortOrder::Descending);
    let pages = use_state(|| Paginator::new(PopupConfig::default().items_per_page));

    // Pause the tracker, flush, then read the snapshot
    {
        let state = state.clone();
        let popup_config = popup_config.clone();
        let pages = pages.clone();
        use_effect_with((), move |_| {
            connectTracker();
            spawn_local(async move {
                match requestFlush().await {
                    Ok(saved) if saved.as_bool() == Some(true) => {}
                    Ok(_) => log::warn!("Tracker did not confirm the flush, data may be stale"),
                    Err(e) => log::warn!("Flush request failed: {:?}", e),
                }

                let config = TrackerConfig::load(&ChromeStore).await;
                pages.set(Paginator::new(config.popup.items_per_page));

                match SiteInfoStore::new(ChromeStore, config.storage_key.clone()).load().await {
                    Ok(info) => state.set(AppState::Ready(info)),
                    Err(e) => {
                        log::error!("Failed to load site info: {}", e);
                        state.set(AppState::Error);
                    }
                }
                popup_config.set(config.popup);
            });
            || ()
        });
    }

    let info = match &*state {
        AppState::Loading => {
            return html! {
                <div class="loading-text-center">
                    <Spinner />
                </div>
            };
        }
        AppState::Error => {
            return html! {
                <div class="padding-20">
                    <Alert r#type={AlertType::Danger} title={"Failed to load website data."} inline={true}>
                    </Alert>
                </div>
            };
        }
        AppState::Ready(info) => info,
    };

    let today = SystemClock.today();
    let mut usage = usage_for(info, *category, &today);
    sort_usage(&mut usage, *sort_key, *sort_order);

    let mut pager = *pages;
    pager.set_len(usage.len());

    let slices = chart_slices(&usage, popup_config.chart_top);
    let shares = slice_percentages(&slices);

    let on_category = {
        let category = category.clone();
        let pages = pages.clone();
        move |selected: Category| {
            let category = category.clone();
            let pages = pages.clone();
            Callback::from(move |_: MouseEvent| {
                category.set(selected);
                let mut reset = *pages;
                reset.reset();
                pages.set(reset);
            })
        }
    };

    let on_sort_key = {
        let sort_key = sort_key.clone();
        Callback::from(move |_: MouseEvent| sort_key.set(sort_key.toggled()))
    };

    let on_sort_order = {
        let sort_order = sort_order.clone();
        Callback::from(move |_: MouseEvent| sort_order.set(sort_order.toggled()))
    };

    let on_previous = {
        let pages = pages.clone();
        Callback::from(move |_: MouseEvent| {
            let mut moved = pager;
            if moved.previous() {
                pages.set(moved);
            }
        })
    };

    let on_next = {
        let pages = pages.clone();
        Callback::from(move |_: MouseEvent| {
            let mut moved = pager;
            if moved.next() {
                pages.set(moved);
            }
        })
    };

    let tab_class = |tab: Category| {
        if *category == tab {
            "pf-v5-c-tabs__item pf-m-current"
        } else {
            "pf-v5-c-tabs__item"
        }
    };

    html! {
        <div class="padding-20">
            <h1 class="popup-title">{"Site Timer"}</h1>

            <div class="pf-v5-c-tabs tabs-nav">
                <ul class="pf-v5-c-tabs__list">
                    <li class={tab_class(Category::Today)}>
                        <button class="pf-v5-c-tabs__link" onclick={on_category(Category::Today)}>
                            <span class="pf-v5-c-tabs__item-text">{"Today"}</span>
                        </button>
                    </li>
                    <li class={tab_class(Category::Total)}>
                        <button class="pf-v5-c-tabs__link" onclick={on_category(Category::Total)}>
                            <span class="pf-v5-c-tabs__item-text">{"Total"}</span>
                        </button>
                    </li>
                </ul>
            </div>

            if usage.is_empty() {
                <p class="message-text">{"No websites tracked yet."}</p>
            } else {
                <div class="stats-container">
                    <h2 class="stats-title">{format!("Top {} websites", slices.len())}</h2>
                    <div class="stats-box">
                        {for slices.iter().zip(shares.iter()).map(|((domain, _), share)| html! {
                            <div class="stat-item">
                                <span class="stat-domain">{domain}</span>
                                <div class="share-bar" style={format!("width: {}%", share)}></div>
                                <span class="stat-count">{format!("{}%", share)}</span>
                            </div>
                        })}
                    </div>
                </div>

                <div class="flex-row-gap">
                    <Button onclick={on_sort_key} variant={ButtonVariant::Secondary}>
                        {format!("Sort by {}", sort_key.label())}
                    </Button>
                    <Button onclick={on_sort_order} variant={ButtonVariant::Secondary}>
                        {sort_order.label()}
                    </Button>
                </div>

                <div class="site-list">
                    {for pager.page(&usage).iter().map(|site| html! {
                        <div class="site-item">
                            <span class="site-domain">{&site.domain}</span>
                            <span class="site-time">{format_duration(site.time)}</span>
                            <span class="site-sessions">{format!("{} sessions", site.sessions)}</span>
                        </div>
                    })}
                </div>

                <div class="flex-row-gap">
                    <Button onclick={on_previous} disabled={!pager.has_previous()} variant={ButtonVariant::Plain}>
                        {"‹"}
                    </Button>
                    <span class="page-label">{pager.label()}</span>
                    <Button onclick={on_next} disabled={!pager.has_next()} variant={ButtonVariant::Plain}>
                        {"›"}
                    </Button>
                </div>
            }

            <p class="footer-popup">
                {"Site Timer v0.1.0"}
            </p>
        </div>
    }
}
