//! 平台注册表
//!
//! 文档库中所有平台相关的命名都由这里统一导出：
//! - `id`：变更描述 JSON 中使用的平台键（如 `windows`）
//! - `token`：DITA `props` 条件属性与 keysmap 文件名中的标记（如 `cpp`）
//! - `label`：导航图文件名中的平台段（如 `CPP`）
//!
//! 平台在注册表中的声明顺序是规范顺序：`props` 串的渲染
//! 顺序只取决于它，与输入 JSON 的书写顺序无关。

use serde::{Deserialize, Serialize};

/// 目标平台
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Android,
    Windows,
    Ios,
    Macos,
    Unity,
    Unreal,
    Cs,
    Electron,
    Flutter,
    Rn,
}

// 平台集合标志位定义
bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PlatformSet: u16 {
        const ANDROID = 0x0001;    // Android (Java)
        const WINDOWS = 0x0002;    // Windows (C++)
        const IOS = 0x0004;        // iOS (Objective-C)
        const MACOS = 0x0008;      // macOS (Objective-C)
        const UNITY = 0x0010;      // Unity (C#)
        const UNREAL = 0x0020;     // Unreal (C++/Blueprint)
        const CS = 0x0040;         // Windows C#
        const ELECTRON = 0x0080;   // Electron
        const FLUTTER = 0x0100;    // Flutter (Dart)
        const RN = 0x0200;         // React Native
    }
}

/// 注册表条目
struct PlatformInfo {
    platform: Platform,
    id: &'static str,
    token: &'static str,
    label: &'static str,
}

/// 规范顺序的平台注册表
const REGISTRY: &[PlatformInfo] = &[
    PlatformInfo { platform: Platform::Android, id: "android", token: "java", label: "Android" },
    PlatformInfo { platform: Platform::Windows, id: "windows", token: "cpp", label: "CPP" },
    PlatformInfo { platform: Platform::Ios, id: "ios", token: "ios", label: "iOS" },
    PlatformInfo { platform: Platform::Macos, id: "macos", token: "macos", label: "macOS" },
    PlatformInfo { platform: Platform::Unity, id: "unity", token: "unity", label: "Unity" },
    PlatformInfo { platform: Platform::Unreal, id: "unreal", token: "unreal", label: "Unreal" },
    PlatformInfo { platform: Platform::Cs, id: "cs", token: "cs", label: "CS" },
    PlatformInfo { platform: Platform::Electron, id: "electron", token: "electron", label: "Electron" },
    PlatformInfo { platform: Platform::Flutter, id: "flutter", token: "flutter", label: "Flutter" },
    PlatformInfo { platform: Platform::Rn, id: "rn", token: "rn", label: "RN" },
];

/// 展开为全平台集合的哨兵值
pub const ALL_PLATFORMS_ID: &str = "all";

impl Platform {
    /// 规范顺序的全部平台
    pub const ALL: [Platform; 10] = [
        Platform::Android,
        Platform::Windows,
        Platform::Ios,
        Platform::Macos,
        Platform::Unity,
        Platform::Unreal,
        Platform::Cs,
        Platform::Electron,
        Platform::Flutter,
        Platform::Rn,
    ];

    /// 按变更描述中的平台键查找平台
    ///
    /// # 参数
    /// * `id` - JSON 中的平台键，如 `"windows"`
    ///
    /// # 返回
    /// 未注册的键返回 `None`，由调用方决定告警方式
    pub fn resolve(id: &str) -> Option<Platform> {
        REGISTRY.iter().find(|info| info.id == id).map(|info| info.platform)
    }

    // 注册表与枚举声明顺序一致，可按判别值索引
    fn info(self) -> &'static PlatformInfo {
        &REGISTRY[self as usize]
    }

    /// 变更描述中的平台键
    pub fn id(self) -> &'static str {
        self.info().id
    }

    /// props 条件属性中的标记
    pub fn token(self) -> &'static str {
        self.info().token
    }

    /// 导航图文件名中的平台段
    pub fn label(self) -> &'static str {
        self.info().label
    }

    /// 对应的集合位
    pub fn bit(self) -> PlatformSet {
        match self {
            Platform::Android => PlatformSet::ANDROID,
            Platform::Windows => PlatformSet::WINDOWS,
            Platform::Ios => PlatformSet::IOS,
            Platform::Macos => PlatformSet::MACOS,
            Platform::Unity => PlatformSet::UNITY,
            Platform::Unreal => PlatformSet::UNREAL,
            Platform::Cs => PlatformSet::CS,
            Platform::Electron => PlatformSet::ELECTRON,
            Platform::Flutter => PlatformSet::FLUTTER,
            Platform::Rn => PlatformSet::RN,
        }
    }
}

/// 展开单个平台键，`all` 哨兵展开为全集
pub fn expand_id(id: &str) -> Option<PlatformSet> {
    if id == ALL_PLATFORMS_ID {
        return Some(PlatformSet::all());
    }
    Platform::resolve(id).map(Platform::bit)
}

impl PlatformSet {
    /// 解析一组平台键为集合
    ///
    /// 未注册的键记录告警后剔除，不中断处理。
    pub fn resolve_ids<'a>(ids: impl IntoIterator<Item = &'a str>) -> PlatformSet {
        let mut set = PlatformSet::empty();
        for id in ids {
            match expand_id(id) {
                Some(bits) => set |= bits,
                None => log::warn!("未知平台标识 '{}'，已忽略", id),
            }
        }
        set
    }

    /// 以规范顺序迭代集合中的平台
    pub fn platforms(self) -> impl Iterator<Item = Platform> {
        Platform::ALL.into_iter().filter(move |p| self.contains(p.bit()))
    }

    /// 渲染为 props 条件属性值（规范顺序、空格连接）
    pub fn props(self) -> String {
        let tokens: Vec<&str> = self.platforms().map(Platform::token).collect();
        tokens.join(" ")
    }
}

/// 合并已有 props 串与新平台集合
///
/// 已有标记保持原位（包括手写的非注册表标记），缺少的新标记
/// 按规范顺序追加到末尾。
pub fn merge_props(existing: &str, incoming: PlatformSet) -> String {
    let mut tokens: Vec<String> = existing.split_whitespace().map(String::from).collect();
    for platform in incoming.platforms() {
        let token = platform.token();
        if !tokens.iter().any(|t| t == token) {
            tokens.push(token.to_string());
        }
    }
    tokens.join(" ")
}
