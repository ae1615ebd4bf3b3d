//! エンジン側の発話IDとコントローラーの発話IDの対応付け
//!
//! OS音声エンジンのコールバックはエンジン固有のIDしか渡さないため、
//! ここでコントローラーの `UtteranceId` に引き戻す。エンジンに依存しないので
//! nativeフィーチャーなしでもテストできる。

#![cfg_attr(not(feature = "native"), allow(dead_code))]

use crate::speech::UtteranceId;

/// エンジンの発話IDとコントローラーの発話IDの対応表
#[derive(Debug)]
pub(crate) struct UtteranceMap<K> {
    entries: Vec<(K, UtteranceId)>,
    /// 送信済みでエンジンIDがまだ登録されていない発話
    unregistered: Option<UtteranceId>,
}

impl<K> Default for UtteranceMap<K> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            unregistered: None,
        }
    }
}

impl<K: PartialEq> UtteranceMap<K> {
    /// エンジンへ送る直前に呼ぶ
    pub fn begin(&mut self, id: UtteranceId) {
        self.unregistered = Some(id);
    }

    /// エンジンが返したIDを登録
    pub fn register(&mut self, engine_id: K, id: UtteranceId) {
        if self.unregistered == Some(id) {
            self.unregistered = None;
        }
        self.entries.push((engine_id, id));
    }

    /// 未知のエンジンIDは登録待ちの発話にだけ対応させる
    pub fn resolve(&self, engine_id: &K) -> Option<UtteranceId> {
        self.entries
            .iter()
            .find(|(id, _)| id == engine_id)
            .map(|(_, id)| *id)
            .or(self.unregistered)
    }

    /// 終了した発話を取り除き、その発話IDを返す
    pub fn remove(&mut self, engine_id: &K) -> Option<UtteranceId> {
        let resolved = self.resolve(engine_id)?;
        self.entries.retain(|(id, _)| id != engine_id);
        if self.unregistered == Some(resolved) {
            self.unregistered = None;
        }
        Some(resolved)
    }

    /// 追跡中の発話をすべて取り出す
    pub fn drain(&mut self) -> Vec<UtteranceId> {
        let mut drained: Vec<UtteranceId> = self.entries.drain(..).map(|(_, id)| id).collect();
        if let Some(id) = self.unregistered.take() {
            if !drained.contains(&id) {
                drained.push(id);
            }
        }
        drained
    }

    /// 最も新しい追跡中の発話
    pub fn latest(&self) -> Option<UtteranceId> {
        self.entries
            .iter()
            .map(|(_, id)| *id)
            .chain(self.unregistered)
            .max()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.unregistered.is_none()
    }
}

/// 一度も再生中にならないまま待つポーリング回数の上限
const IDLE_POLL_LIMIT: u32 = 20;

/// `is_speaking` のポーリング結果から発話終了を検出する
///
/// 発話コールバックを持たないエンジン向け。追跡中の発話が再生中になった後に
/// 止まるか、一度も再生中にならないまま上限回数を過ぎたら終了扱いにする。
#[derive(Debug, Default)]
pub(crate) struct SpeakingWatch {
    tracking: Option<UtteranceId>,
    was_speaking: bool,
    idle_polls: u32,
}

impl SpeakingWatch {
    pub fn observe<K: PartialEq>(
        &mut self,
        speaking: bool,
        utterances: &mut UtteranceMap<K>,
    ) -> Vec<UtteranceId> {
        let latest = utterances.latest();
        if latest != self.tracking {
            // 新しい発話に切り替わったら観測をやり直す
            *self = Self {
                tracking: latest,
                ..Self::default()
            };
        }
        if latest.is_none() {
            return Vec::new();
        }

        if speaking {
            self.was_speaking = true;
            self.idle_polls = 0;
            return Vec::new();
        }

        self.idle_polls += 1;
        if self.was_speaking || self.idle_polls >= IDLE_POLL_LIMIT {
            *self = Self::default();
            utterances.drain()
        } else {
            Vec::new()
        }
    }
}

/// エンジンに設定すべき音声IDを決める
///
/// 指定なし、または指定した音声が見つからない場合はエンジン起動時の既定音声に戻す。
pub(crate) fn target_voice_id<'a>(
    requested: Option<&'a str>,
    available: &[String],
    engine_default: Option<&'a str>,
) -> Option<&'a str> {
    requested
        .filter(|uri| available.iter().any(|id| id == uri))
        .or(engine_default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolves_registered_engine_ids() {
        let mut map = UtteranceMap::default();
        map.begin(UtteranceId(1));
        map.register(10u64, UtteranceId(1));

        assert_eq!(map.resolve(&10), Some(UtteranceId(1)));
        assert_eq!(map.resolve(&99), None);
    }

    #[test]
    fn test_callback_before_registration_uses_pending_utterance() {
        let mut map: UtteranceMap<u64> = UtteranceMap::default();
        map.begin(UtteranceId(4));

        // エンジンがIDを返す前に開始コールバックが届くことがある
        assert_eq!(map.resolve(&40), Some(UtteranceId(4)));
        assert_eq!(map.remove(&40), Some(UtteranceId(4)));
        assert!(map.is_empty());
    }

    #[test]
    fn test_late_callback_for_removed_id_is_not_mapped_to_new_utterance() {
        let mut map = UtteranceMap::default();
        map.begin(UtteranceId(1));
        map.register(10u64, UtteranceId(1));
        assert_eq!(map.remove(&10), Some(UtteranceId(1)));

        map.begin(UtteranceId(2));
        map.register(20u64, UtteranceId(2));

        // 1件目の停止通知が重複して届いても2件目は終了扱いにならない
        assert_eq!(map.remove(&10), None);
        assert_eq!(map.resolve(&20), Some(UtteranceId(2)));
        assert!(!map.is_empty());
    }

    #[test]
    fn test_drain_returns_registered_and_pending() {
        let mut map = UtteranceMap::default();
        map.begin(UtteranceId(1));
        map.register(10u64, UtteranceId(1));
        map.begin(UtteranceId(2));

        assert_eq!(map.drain(), vec![UtteranceId(1), UtteranceId(2)]);
        assert!(map.is_empty());
    }

    #[test]
    fn test_speaking_watch_reports_end_after_playback() {
        let mut map = UtteranceMap::default();
        let mut watch = SpeakingWatch::default();
        map.begin(UtteranceId(7));
        map.register(70u64, UtteranceId(7));

        // 再生開始前の「停止中」は終了とみなさない
        assert!(watch.observe(false, &mut map).is_empty());
        assert!(watch.observe(true, &mut map).is_empty());
        assert!(watch.observe(true, &mut map).is_empty());
        assert_eq!(watch.observe(false, &mut map), vec![UtteranceId(7)]);
        assert!(map.is_empty());
        assert!(watch.observe(false, &mut map).is_empty());
    }

    #[test]
    fn test_speaking_watch_restarts_for_new_utterance() {
        let mut map = UtteranceMap::default();
        let mut watch = SpeakingWatch::default();
        map.begin(UtteranceId(1));
        map.register(10u64, UtteranceId(1));
        assert!(watch.observe(true, &mut map).is_empty());

        // 再生中にキャンセルして次を送った直後はまだ再生が始まっていない
        map.drain();
        map.begin(UtteranceId(2));
        map.register(20u64, UtteranceId(2));
        assert!(watch.observe(false, &mut map).is_empty());
        assert_eq!(map.latest(), Some(UtteranceId(2)));
    }

    #[test]
    fn test_speaking_watch_gives_up_on_silent_utterance() {
        let mut map: UtteranceMap<u64> = UtteranceMap::default();
        let mut watch = SpeakingWatch::default();
        map.begin(UtteranceId(3));

        for _ in 1..IDLE_POLL_LIMIT {
            assert!(watch.observe(false, &mut map).is_empty());
        }
        assert_eq!(watch.observe(false, &mut map), vec![UtteranceId(3)]);
    }

    #[test]
    fn test_no_voice_selected_returns_to_engine_default() {
        let available = vec!["alex".to_string(), "kyoko".to_string()];

        assert_eq!(target_voice_id(None, &available, Some("alex")), Some("alex"));
        assert_eq!(
            target_voice_id(Some("kyoko"), &available, Some("alex")),
            Some("kyoko")
        );
        // 消えた音声は既定音声に戻す
        assert_eq!(
            target_voice_id(Some("gone"), &available, Some("alex")),
            Some("alex")
        );
        assert_eq!(target_voice_id(None, &available, None), None);
    }
}
