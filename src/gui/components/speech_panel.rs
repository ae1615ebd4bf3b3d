//! 読み上げパネル
//!
//! 音声セレクタ・話速・音高・テキスト入力と読み上げ/停止ボタン

use dioxus::prelude::*;

use crate::controller::KeyPress;
use crate::gui::hooks::SpeechSessionHandle;
use crate::session::UiCommand;

/// 読み上げパネルコンポーネント
#[component]
pub fn SpeechPanel() -> Element {
    let session = use_context::<SpeechSessionHandle>();
    let view = session.view.read().clone();
    let notice = session.notice.read().clone();

    let selected_index = view
        .selector
        .selected
        .as_ref()
        .and_then(|key| {
            view.selector
                .options
                .iter()
                .position(|entry| entry.key.as_ref() == Some(key))
        })
        .unwrap_or(0);

    rsx! {
        div {
            style: "
                background: #f8f9fa;
                border: 1px solid #e9ecef;
                border-radius: 8px;
                padding: 16px;
                display: flex;
                flex-direction: column;
                gap: 12px;
            ",

            h3 {
                style: "margin: 0; color: #495057;",
                "🔊 テキスト読み上げ"
            }

            // 通知バナー
            if let Some(notice) = notice {
                div {
                    style: "
                        background: #fff3cd;
                        border: 1px solid #ffe69c;
                        border-radius: 4px;
                        padding: 8px 12px;
                        color: #664d03;
                        display: flex;
                        justify-content: space-between;
                        align-items: center;
                    ",
                    span { "{notice}" }
                    button {
                        style: "border: none; background: transparent; cursor: pointer;",
                        onclick: {
                            let mut session = session.clone();
                            move |_| session.dismiss_notice()
                        },
                        "✕"
                    }
                }
            }

            if !view.available {
                div {
                    style: "color: #842029; font-size: 13px;",
                    "⚠️ この環境では音声合成を利用できません"
                }
            }

            // 音声選択
            label {
                style: "display: flex; flex-direction: column; gap: 4px; font-size: 14px;",
                "音声"
                select {
                    disabled: !view.selector.enabled,
                    value: "{selected_index}",
                    onchange: {
                        let session = session.clone();
                        let options = view.selector.options.clone();
                        move |evt: Event<FormData>| {
                            let key = evt
                                .value()
                                .parse::<usize>()
                                .ok()
                                .and_then(|index| options.get(index))
                                .and_then(|entry| entry.key.clone());
                            session.send(UiCommand::SelectVoice(key));
                        }
                    },
                    for (index, entry) in view.selector.options.iter().enumerate() {
                        option {
                            key: "{index}",
                            value: "{index}",
                            disabled: !entry.enabled,
                            selected: index == selected_index,
                            "{entry.label}"
                        }
                    }
                }
            }

            // 話速
            label {
                style: "display: flex; flex-direction: column; gap: 4px; font-size: 14px;",
                "話速: {view.form.rate}"
                input {
                    r#type: "range",
                    min: "0.5",
                    max: "2",
                    step: "0.1",
                    value: "{view.form.rate}",
                    oninput: {
                        let session = session.clone();
                        move |evt: Event<FormData>| session.send(UiCommand::SetRate(evt.value()))
                    }
                }
            }

            // 音高
            label {
                style: "display: flex; flex-direction: column; gap: 4px; font-size: 14px;",
                "音高: {view.form.pitch}"
                input {
                    r#type: "range",
                    min: "0",
                    max: "2",
                    step: "0.1",
                    value: "{view.form.pitch}",
                    oninput: {
                        let session = session.clone();
                        move |evt: Event<FormData>| session.send(UiCommand::SetPitch(evt.value()))
                    }
                }
            }

            textarea {
                rows: "6",
                placeholder: "読み上げるテキストを入力（Ctrl+Enterで読み上げ）",
                style: "
                    width: 100%;
                    box-sizing: border-box;
                    padding: 8px;
                    border: 1px solid #ced4da;
                    border-radius: 4px;
                    font-size: 14px;
                ",
                value: "{view.form.text}",
                oninput: {
                    let session = session.clone();
                    move |evt: Event<FormData>| session.send(UiCommand::SetText(evt.value()))
                },
                onkeydown: {
                    let session = session.clone();
                    let available = view.available;
                    move |evt: Event<KeyboardData>| {
                        let modifiers = evt.modifiers();
                        let key = KeyPress {
                            key: evt.key().to_string(),
                            ctrl: modifiers.contains(Modifiers::CONTROL),
                            meta: modifiers.contains(Modifiers::META),
                        };
                        if available && key.is_speak_shortcut() {
                            evt.prevent_default();
                            session.send(UiCommand::Key(key));
                        }
                    }
                }
            }

            div {
                style: "display: flex; gap: 8px;",
                button {
                    disabled: !view.controls.speak_enabled,
                    style: "
                        padding: 8px 16px;
                        background: #0d6efd;
                        color: white;
                        border: none;
                        border-radius: 4px;
                        cursor: pointer;
                    ",
                    onclick: {
                        let session = session.clone();
                        move |_| session.send(UiCommand::Speak)
                    },
                    "▶ 読み上げ"
                }
                button {
                    disabled: !view.controls.stop_enabled,
                    style: "
                        padding: 8px 16px;
                        background: #6c757d;
                        color: white;
                        border: none;
                        border-radius: 4px;
                        cursor: pointer;
                    ",
                    onclick: {
                        let session = session.clone();
                        move |_| session.send(UiCommand::Stop)
                    },
                    "■ 停止"
                }
            }
        }
    }
}
