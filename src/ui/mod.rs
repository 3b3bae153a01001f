use leptos::*;
use std::rc::Rc;
use std::time::Duration;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

use crate::core::capture::{CaptureSource, CaptureState};
use crate::core::config::Config;
use crate::core::io::{Storage, WebStorage};
use crate::core::navigation::GuardState;
use crate::core::slides::{CustomComponent, Slide, TextAlign, INTRO_SLIDE_ID};
use crate::core::state::{Direction, HoverSide};
use crate::services::api::{AnalysisApi, SkinstricClient};
use crate::services::concerns::{concern, format_percentage, CONCERNS};
use crate::services::selection::Category;
use crate::services::session::Session;
use crate::utils::image::encode_image;

type Api = StoredValue<Rc<dyn AnalysisApi>>;

fn now_ms() -> u64 {
    js_sys::Date::now() as u64
}

fn camera_supported() -> bool {
    web_sys::window()
        .map(|w| w.navigator().media_devices().is_ok())
        .unwrap_or(false)
}

#[component]
pub fn App() -> impl IntoView {
    let config = Config::default();
    let session = create_rw_signal(Session::new(&config));

    let services = SkinstricClient::new(&config)
        .map(|c| Rc::new(c) as Rc<dyn AnalysisApi>)
        .and_then(|api| Ok((api, Rc::new(WebStorage::new()?) as Rc<dyn Storage>)))
        .map_err(|e| e.to_string());

    // drives the goodbye and loading timers
    set_interval(
        move || {
            let now = now_ms();
            let due = session.with_untracked(|s| s.next_deadline_ms().is_some_and(|d| now >= d));
            if due {
                session.update(|s| {
                    s.tick(now);
                });
            }
        },
        Duration::from_millis(100),
    );

    match services {
        Ok((api, storage)) => {
            let api = store_value(api);
            let storage = store_value(storage);
            view! {
                <div class="app-container">
                    <Header session=session/>
                    <SlideView session=session api=api storage=storage/>
                    <LeaveDialog session=session/>
                </div>
            }
            .into_view()
        }
        Err(e) => view! { <p>"Error starting Skintrinsic: " {e}</p> }.into_view(),
    }
}

#[component]
fn Header(session: RwSignal<Session>) -> impl IntoView {
    let on_logo = move |_| {
        session.update(|s| {
            s.go_home();
        });
    };
    let on_restart = move |_| session.update(|s| s.restart());
    let section = move || session.with(|s| format!("[ {} ]", s.current_slide().section_label()));
    let away_from_intro = move || session.with(|s| !s.navigator().is_first());
    view! {
        <header class="header">
            <button class="logo" on:click=on_logo>"SKINSTRIC"</button>
            <span class="section">{section}</span>
            {move || away_from_intro().then(|| view! {
                <button class="restart" on:click=on_restart>"START OVER"</button>
            })}
        </header>
    }
}

#[component]
fn SlideView(session: RwSignal<Session>, api: Api, storage: StoredValue<Rc<dyn Storage>>) -> impl IntoView {
    let slide = create_memo(move |_| session.with(|s| s.current_slide().clone()));
    let direction = move || match session.with(|s| s.navigation_state().direction()) {
        Direction::Forward => "slide slide-forward",
        Direction::Backward => "slide slide-backward",
    };

    let title_style = move || {
        let is_intro = slide.with(|s| s.id == INTRO_SLIDE_ID);
        session.with(|s| {
            let offset = s.intro().title_offset_px(is_intro).unwrap_or(0);
            let align = match s.intro().effective_text_align(is_intro) {
                TextAlign::Center => "center",
                TextAlign::Left => "left",
                TextAlign::Right => "right",
            };
            format!("transform: translateX({}px); text-align: {}", offset, align)
        })
    };

    let body = move || {
        let current = slide.get();
        match current.custom_component {
            Some(CustomComponent::NameForm) | Some(CustomComponent::LocationForm) => {
                view! { <IdentityForm session=session api=api/> }.into_view()
            }
            Some(CustomComponent::ImageCapture) => {
                view! { <CaptureView session=session api=api/> }.into_view()
            }
            Some(CustomComponent::AnalysisCategories) => view! { <CategoriesView session=session slide=slide/> }.into_view(),
            Some(CustomComponent::Demographics) => {
                view! { <DemographicsView session=session/> }.into_view()
            }
            Some(CustomComponent::CosmeticConcerns) => {
                view! { <ConcernsView session=session/> }.into_view()
            }
            None => view! { <p class="body">{current.body.clone()}</p> }.into_view(),
        }
    };

    view! {
        <main class=direction>
            <p class="kicker">{move || slide.with(|s| s.kicker.clone())}</p>
            <h1 class="title" style=title_style>{move || slide.with(|s| s.title.clone())}</h1>
            {body}
            <IntroHover session=session slide=slide/>
            <Footer session=session slide=slide storage=storage/>
        </main>
    }
}

#[component]
fn IntroHover(session: RwSignal<Session>, slide: Memo<Slide>) -> impl IntoView {
    let hover = move |side: Option<HoverSide>| {
        move |_: ev::MouseEvent| session.update(|s| s.hover_intro(side))
    };
    move || {
        slide.with(|s| s.id == INTRO_SLIDE_ID).then(|| {
            view! {
                <div class="intro-hover">
                    <div class="left" on:mouseenter=hover(Some(HoverSide::Left)) on:mouseleave=hover(None)></div>
                    <div class="right" on:mouseenter=hover(Some(HoverSide::Right)) on:mouseleave=hover(None)></div>
                </div>
            }
        })
    }
}

#[component]
fn Footer(session: RwSignal<Session>, slide: Memo<Slide>, storage: StoredValue<Rc<dyn Storage>>) -> impl IntoView {
    let on_back = move |_| {
        session.update(|s| {
            s.go_back();
        })
    };
    let on_next = move |_| {
        session.update(|s| {
            s.go_next();
        })
    };
    let on_reset = move |_| {
        session.update(|s| {
            s.press_reset();
        })
    };
    let on_confirm = move |_| {
        let snapshot = session.with_untracked(|s| s.selections().clone());
        let storage = storage.get_value();
        spawn_local(async move {
            match snapshot.confirm_selections(storage.as_ref()).await {
                Ok(_) => session.update(|s| {
                    s.follow_confirm();
                }),
                Err(e) => leptos::logging::error!("Failed to confirm selections: {:?}", e),
            }
        });
    };

    move || {
        let current = slide.get();
        let text = current.footer_content.shows_text().then(|| {
            view! { <p class="footer-text">"TO START ANALYSIS"</p> }
        });
        let back = current.back_button.clone().map(|b| view! { <button class="back" on:click=on_back>{b.text}</button> });
        let next = current.next_button.clone().map(|b| view! { <button class="next" on:click=on_next>{b.text}</button> });
        let reset = current.reset_button.clone().map(|b| view! { <button class="reset" on:click=on_reset>{b.text}</button> });
        let confirm = current.confirm_button.clone().map(|b| view! { <button class="confirm" on:click=on_confirm>{b.text}</button> });
        view! {
            <footer class="footer">{text} {back} {reset} {confirm} {next}</footer>
        }
    }
}

#[component]
fn IdentityForm(session: RwSignal<Session>, api: Api) -> impl IntoView {
    let is_name = move || {
        session.with(|s| s.current_slide().custom_component == Some(CustomComponent::NameForm))
    };
    let value = move || {
        session.with(|s| {
            if is_name() {
                s.form().name.clone()
            } else {
                s.form().location.clone()
            }
        })
    };
    let on_input = move |ev| {
        let text = event_target_value(&ev);
        let name_step = is_name();
        session.update(|s| {
            if name_step {
                s.set_name(&text);
            } else {
                s.set_location(&text);
            }
        });
    };

    let submit = move || {
        if session.with_untracked(|s| s.current_slide().custom_component == Some(CustomComponent::NameForm)) {
            session.update(|s| {
                s.submit_name();
            });
            return;
        }
        let Some(ticket) = session.try_update(|s| s.begin_location_submit()).flatten() else {
            return;
        };
        let (name, location) =
            session.with_untracked(|s| (s.form().name.clone(), s.form().location.clone()));
        let api = api.get_value();
        spawn_local(async move {
            let result = api.submit_identity(&name, &location).await;
            session.update(|s| {
                s.finish_location_submit(ticket, result);
            });
        });
    };
    let on_keydown = move |ev: ev::KeyboardEvent| {
        if ev.key() == "Enter" {
            ev.prevent_default();
            submit();
        }
    };

    view! {
        <div class="identity-form">
            <p class="hint">"CLICK TO TYPE"</p>
            <input
                type="text"
                placeholder=move || if is_name() { "Introduce Yourself" } else { "Where are you from?" }
                prop:value=value
                prop:disabled=move || session.with(|s| s.form().is_submitting)
                on:input=on_input
                on:keydown=on_keydown
            />
            {move || session.with(|s| s.form().is_submitting).then(|| view! { <p class="status">"Processing submission..."</p> })}
            {move || session.with(|s| s.form().submit_error.clone()).map(|e| view! { <p class="error">{e}</p> })}
        </div>
    }
}

#[component]
fn CaptureView(session: RwSignal<Session>, api: Api) -> impl IntoView {
    let request = move |source: CaptureSource| {
        move |_: ev::MouseEvent| {
            session.update(|s| {
                s.request_capture(source);
            })
        }
    };
    let on_allow = move |_| {
        let now = now_ms();
        let camera = session.with_untracked(|s| s.capture().state() == &CaptureState::CameraPermission);
        session.update(|s| {
            s.allow_capture(now);
            if camera && !camera_supported() {
                s.camera_unavailable("no media devices");
            }
        });
    };
    let on_deny = move |_| {
        session.update(|s| {
            s.deny_capture();
        })
    };
    let on_close = move |_| {
        session.update(|s| {
            s.close_capture();
        })
    };

    let on_file = move |ev: ev::Event| {
        let Some(input) = ev
            .target()
            .and_then(|t| t.dyn_into::<web_sys::HtmlInputElement>().ok())
        else {
            return;
        };
        let Some(file) = input.files().and_then(|f| f.get(0)) else {
            return;
        };
        let api = api.get_value();
        spawn_local(async move {
            let bytes = match JsFuture::from(file.array_buffer()).await {
                Ok(buffer) => js_sys::Uint8Array::new(&buffer).to_vec(),
                Err(e) => {
                    leptos::logging::error!("Failed to read image: {:?}", e);
                    return;
                }
            };
            let image = match encode_image(&bytes) {
                Ok(image) => image,
                Err(e) => {
                    leptos::logging::error!("{}", e);
                    return;
                }
            };
            let Some(ticket) = session.try_update(|s| {
                s.retake();
                s.begin_upload()
            }).flatten() else {
                return;
            };
            let result = api.upload_image(&image).await;
            session.update(|s| {
                if let Err(message) = s.finish_upload(ticket, result, now_ms()) {
                    leptos::logging::warn!("{}", message);
                }
            });
        });
    };

    move || {
        let state = session.with(|s| s.capture().state().clone());
        match state {
            CaptureState::Idle => view! {
                <div class="capture-choices">
                    <button on:click=request(CaptureSource::Camera)>"ALLOW A.I. TO SCAN YOUR FACE"</button>
                    <button on:click=request(CaptureSource::Gallery)>"ALLOW A.I. ACCESS GALLERY"</button>
                </div>
            }
            .into_view(),
            CaptureState::CameraPermission | CaptureState::GalleryPermission => view! {
                <div class="dialog">
                    <p>"ALLOW A.I. TO ACCESS YOUR CAMERA/GALLERY"</p>
                    <button on:click=on_deny>"DENY"</button>
                    <button on:click=on_allow>"ALLOW"</button>
                </div>
            }
            .into_view(),
            CaptureState::CameraSetup { .. } => {
                view! { <p class="loading">"SETTING UP CAMERA ..."</p> }.into_view()
            }
            CaptureState::Capturing { source, error } => {
                let disabled = !session.with(|s| s.capture().can_capture());
                let camera = source == CaptureSource::Camera;
                view! {
                    <div class="capture">
                        {error.map(|e| view! { <p class="error">{e}</p> })}
                        <input
                            type="file"
                            accept="image/*"
                            capture=camera.then_some("user")
                            prop:disabled=disabled
                            on:change=on_file
                        />
                        <button on:click=on_close>"CLOSE"</button>
                    </div>
                }
                .into_view()
            }
            CaptureState::Uploading { .. } => view! { <p class="loading">"Uploading ..."</p> }.into_view(),
            CaptureState::PreparingAnalysis { .. } => {
                view! { <p class="loading">"PREPARING YOUR ANALYSIS ..."</p> }.into_view()
            }
            CaptureState::Complete => ().into_view(),
        }
    }
}

#[component]
fn CategoriesView(session: RwSignal<Session>, slide: Memo<Slide>) -> impl IntoView {
    let tiles = move || {
        slide.with(|s| s.links.clone())
            .into_iter()
            .map(|link| {
                let target = link.navigate_to.clone();
                let disabled = target.is_none();
                let on_click = move |_: ev::MouseEvent| {
                    if let Some(id) = &target {
                        session.update(|s| {
                            s.go_to_slide_id(id);
                        });
                    }
                };
                view! {
                    <button class="tile" prop:disabled=disabled on:click=on_click>{link.text}</button>
                }
            })
            .collect_view()
    };
    view! { <div class="categories">{tiles}</div> }
}

#[component]
fn DemographicsView(session: RwSignal<Session>) -> impl IntoView {
    let tabs = move || {
        Category::ALL
            .iter()
            .map(|&category| {
                let active = move || session.with(|s| s.active_category() == category);
                let shown = move || {
                    session.with(|s| {
                        s.displayed_entry(category)
                            .map(|e| e.label.to_uppercase())
                            .unwrap_or_default()
                    })
                };
                view! {
                    <button class:active=active on:click=move |_| session.update(|s| s.select_category(category))>
                        <span>{shown}</span>
                        <span>{category.title()}</span>
                    </button>
                }
            })
            .collect_view()
    };

    let entries = move || {
        session.with(|s| {
            let category = s.active_category();
            let Some(analysis) = s.analysis() else {
                return view! { <p>"No analysis yet."</p> }.into_view();
            };
            let shown = s.displayed_entry(category).map(|e| e.label.to_string());
            let mut rows: Vec<(String, f64)> = analysis
                .mapping(category)
                .iter()
                .map(|(l, c)| (l.clone(), *c))
                .collect();
            rows.sort_by(|a, b| b.1.total_cmp(&a.1));
            rows.into_iter()
                .map(|(label, confidence)| {
                    let selected = shown.as_deref() == Some(label.as_str());
                    let pick = label.clone();
                    view! {
                        <li class:selected=selected on:click=move |_| session.update(|s| s.select_entry(&pick))>
                            <span>{label.to_uppercase()}</span>
                            <span>{format_percentage(confidence)}</span>
                        </li>
                    }
                })
                .collect_view()
        })
    };

    view! {
        <div class="demographics">
            <div class="tabs">{tabs}</div>
            <ul class="entries">{entries}</ul>
        </div>
    }
}

#[component]
fn ConcernsView(session: RwSignal<Session>) -> impl IntoView {
    let list = CONCERNS
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let active = move || session.with(|s| s.active_concern() == i);
            let bar = format!("width: {:.0}%", c.fraction() * 100.0);
            view! {
                <li class:active=active on:click=move |_| session.update(|s| s.select_concern(i))>
                    <span>{c.label}</span>
                    <span>{c.percentage}</span>
                    <div class="bar"><div class="fill" style=bar></div></div>
                </li>
            }
        })
        .collect_view();

    let detail = move || {
        concern(session.with(|s| s.active_concern())).map(|c| {
            view! {
                <div class="concern-detail">
                    <h2>{c.label}</h2>
                    <p>{c.definition}</p>
                    <span>{c.percentage}</span>
                </div>
            }
        })
    };

    view! {
        <div class="concerns">
            <ul>{list}</ul>
            {detail}
        </div>
    }
}

#[component]
fn LeaveDialog(session: RwSignal<Session>) -> impl IntoView {
    let on_leave = move |_| {
        let now = now_ms();
        session.update(|s| {
            s.confirm_leave(now);
        })
    };
    let on_cancel = move |_| {
        session.update(|s| {
            s.cancel_leave();
        })
    };
    let on_stay = move |_| {
        session.update(|s| {
            s.stay();
        })
    };

    move || match session.with(|s| s.navigator().guard().state().clone()) {
        GuardState::Idle => ().into_view(),
        GuardState::Confirming { .. } => view! {
            <div class="dialog">
                <p>"Are you sure you want to leave? Your information will not be saved."</p>
                <button on:click=on_cancel>"CANCEL"</button>
                <button on:click=on_leave>"LEAVE"</button>
            </div>
        }
        .into_view(),
        GuardState::Leaving { .. } => view! {
            <div class="dialog">
                <p>"Thank you for visiting. Goodbye!"</p>
                <button on:click=on_stay>"CHANGED MY MIND"</button>
            </div>
        }
        .into_view(),
    }
}
