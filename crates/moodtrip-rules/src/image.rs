//! Image feature rules: colors, objects, light, composition, texture, atmosphere.

use moodtrip_core::KeywordSet;

use crate::features::{Brightness, Contrast, PerceptualFeatures};
use crate::table::{apply_all, apply_first, Rule};

/// Color → emotion lookup. Every matching entry contributes.
const COLOR_EMOTIONS: &[Rule] = &[
    Rule { needles: &["蓝色", "blue"], tags: &["宁静", "冷静", "清新"] },
    Rule { needles: &["绿色", "green"], tags: &["自然", "放松", "生机"] },
    Rule { needles: &["黄色", "yellow"], tags: &["温暖", "活力", "明亮"] },
    Rule { needles: &["红色", "red"], tags: &["热情", "活力", "温暖"] },
    Rule { needles: &["橙色", "orange"], tags: &["温暖", "舒适", "活力"] },
    Rule { needles: &["紫色", "purple"], tags: &["神秘", "优雅", "宁静"] },
    Rule { needles: &["粉色", "pink"], tags: &["温柔", "浪漫", "舒适"] },
    Rule { needles: &["白色", "white"], tags: &["纯净", "简洁", "宁静"] },
    Rule { needles: &["黑色", "black"], tags: &["深沉", "神秘", "安静"] },
    Rule { needles: &["灰色", "gray", "grey"], tags: &["平静", "中性", "沉稳"] },
    Rule { needles: &["暖色调", "warm"], tags: &["温暖", "舒适", "亲切"] },
    Rule { needles: &["冷色调", "cool"], tags: &["冷静", "清新", "宁静"] },
];

/// Color → spatial tendency lookup.
const COLOR_SPACES: &[Rule] = &[
    Rule { needles: &["蓝色", "blue"], tags: &["水边", "天空", "开阔"] },
    Rule { needles: &["绿色", "green"], tags: &["自然", "森林", "公园"] },
    Rule { needles: &["黄色", "yellow"], tags: &["温暖", "阳光", "户外"] },
    Rule { needles: &["暖色调", "warm"], tags: &["温暖", "舒适", "室内"] },
    Rule { needles: &["冷色调", "cool"], tags: &["清新", "自然", "户外"] },
];

/// Object → spatial tendency lookup.
const OBJECT_SPACES: &[Rule] = &[
    Rule { needles: &["山", "mountain", "hill"], tags: &["山地", "自然", "户外"] },
    Rule { needles: &["水", "湖", "water", "lake", "river"], tags: &["水边", "湖泊", "河流"] },
    Rule { needles: &["海", "sea", "ocean", "beach"], tags: &["海边", "海岸", "海洋"] },
    Rule { needles: &["树", "tree", "forest"], tags: &["森林", "公园", "自然"] },
    Rule { needles: &["花", "flower"], tags: &["花园", "自然", "户外"] },
    Rule { needles: &["建筑", "building"], tags: &["城市", "现代", "人文"] },
    Rule { needles: &["天空", "sky"], tags: &["开阔", "户外", "自然"] },
    Rule { needles: &["云", "cloud"], tags: &["开阔", "自然", "户外"] },
    Rule { needles: &["路", "road", "path", "trail"], tags: &["探索", "旅行", "户外"] },
    Rule { needles: &["桥", "bridge"], tags: &["水边", "连接", "人文"] },
];

const COMPOSITION_EMOTIONS: &[Rule] = &[
    Rule { needles: &["开阔", "空旷", "open", "wide"], tags: &["自由", "放松", "开阔"] },
    Rule { needles: &["紧凑", "密集", "compact", "dense"], tags: &["温馨", "亲密", "安全"] },
];

const COMPOSITION_SPACES: &[Rule] = &[
    Rule { needles: &["开阔", "空旷", "open", "wide"], tags: &["开阔", "户外", "自然"] },
    Rule { needles: &["紧凑", "compact"], tags: &["温馨", "室内", "私密"] },
];

const TEXTURE_EMOTIONS: &[Rule] = &[
    Rule { needles: &["自然", "粗糙", "natural", "rough"], tags: &["自然", "原始", "真实"] },
    Rule { needles: &["光滑", "精致", "smooth", "refined"], tags: &["优雅", "精致", "现代"] },
];

const ATMOSPHERE_EMOTIONS: &[Rule] = &[
    Rule { needles: &["空旷", "spacious", "empty"], tags: &["自由", "开阔", "放松"] },
    Rule { needles: &["密集", "crowded", "busy"], tags: &["热闹", "活力", "丰富"] },
    Rule { needles: &["流动", "flowing", "moving"], tags: &["动态", "活力", "变化"] },
];

const ATMOSPHERE_SPACES: &[Rule] = &[
    Rule { needles: &["空旷", "spacious", "empty"], tags: &["开阔", "自然", "户外"] },
    Rule { needles: &["密集", "crowded", "busy"], tags: &["丰富", "热闹", "城市"] },
    Rule { needles: &["流动", "flowing", "moving"], tags: &["动态", "变化", "探索"] },
];

/// Emotion keywords implied by the image features.
pub fn map_to_emotions(features: &PerceptualFeatures) -> KeywordSet {
    let mut out = KeywordSet::new();

    for color in &features.colors {
        apply_all(color, COLOR_EMOTIONS, &mut out);
    }

    match features.brightness_level() {
        Some(Brightness::Bright) => out.extend(["开朗", "积极", "清晰"]),
        Some(Brightness::Dim) => out.extend(["安静", "深沉", "神秘"]),
        Some(Brightness::Medium) => out.extend(["平衡", "舒适"]),
        None => {}
    }

    match features.contrast_level() {
        Some(Contrast::High) => out.extend(["鲜明", "强烈", "清晰"]),
        Some(Contrast::Low) => out.extend(["柔和", "温和", "平静"]),
        Some(Contrast::Medium) | None => {}
    }

    apply_first(&features.composition, COMPOSITION_EMOTIONS, &mut out);
    apply_first(&features.texture, TEXTURE_EMOTIONS, &mut out);
    apply_first(&features.atmosphere, ATMOSPHERE_EMOTIONS, &mut out);

    out
}

/// Spatial-tendency keywords implied by the image features.
pub fn map_to_spatial_tendencies(features: &PerceptualFeatures) -> KeywordSet {
    let mut out = KeywordSet::new();

    for object in &features.objects {
        apply_all(object, OBJECT_SPACES, &mut out);
    }
    for color in &features.colors {
        apply_all(color, COLOR_SPACES, &mut out);
    }

    // Spatial cues need the full word; a bare 亮/暗 only shifts emotions.
    match Brightness::classify_strict(&features.brightness) {
        Some(Brightness::Bright) => out.extend(["开阔", "户外", "阳光"]),
        Some(Brightness::Dim) => out.extend(["安静", "室内", "私密"]),
        Some(Brightness::Medium) | None => {}
    }

    apply_first(&features.composition, COMPOSITION_SPACES, &mut out);
    apply_first(&features.atmosphere, ATMOSPHERE_SPACES, &mut out);

    out
}

/// Emotions followed by spatial tendencies, deduplicated.
pub fn map_features(features: &PerceptualFeatures) -> KeywordSet {
    let mut out = map_to_emotions(features);
    out.merge(&map_to_spatial_tendencies(features));
    out
}
