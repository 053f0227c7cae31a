//! 主题字段填充流水线
//!
//! 把变更记录的各个描述字段写入主题树的对应 section。按平台取值
//! 的字段先经过分组器归并，再由补丁层带查重地插入；create 流程
//! 最后做空节裁剪与默认句填充，modify 流程只做增量合并。
//!
//! 每类对象处理哪些节由 `KindPlan` 查表决定，方法与回调共用一套
//! 计划，差异只在模板文件本身。

use indexmap::IndexMap;

use crate::change::{
    ChangeKind, ChangeRecord, ChangeType, Description, EnumValueSpec, ParamSpec,
};
use crate::dom::{Element, XmlDocument};
use crate::grouper::{group_by_key, group_values};
use crate::patcher::{
    append_child, find_plentry, find_plentry_by_values, merge_element_props, patch_grouped_text,
    props_text_element, text_element, PatchMode, PatchOutcome,
};
use crate::platforms::{Platform, PlatformSet};
use crate::pruner::{self, SectionDefaults};
use crate::utils::{is_blank, SyncError};

/// 各类别的填充计划
struct KindPlan {
    prototype: bool,
    parameters: bool,
    enumerations: bool,
    return_values: bool,
    optional_sections: bool,
    mandatory_sections: bool,
    drop_sections: &'static [&'static str],
}

const fn plan_for(kind: ChangeKind) -> KindPlan {
    match kind {
        // 回调与方法共用计划，回调模板没有的节会在查找时跳过
        ChangeKind::Api | ChangeKind::Callback => KindPlan {
            prototype: true,
            parameters: true,
            enumerations: false,
            return_values: true,
            optional_sections: true,
            mandatory_sections: true,
            drop_sections: &[],
        },
        ChangeKind::Class => KindPlan {
            prototype: false,
            parameters: true,
            enumerations: false,
            return_values: false,
            optional_sections: false,
            mandatory_sections: false,
            drop_sections: &["sub-class", "sub-method"],
        },
        ChangeKind::Enum => KindPlan {
            prototype: false,
            parameters: false,
            enumerations: true,
            return_values: false,
            optional_sections: false,
            mandatory_sections: false,
            drop_sections: &[],
        },
    }
}

/// 将变更记录的内容写入主题文档
///
/// create 流程在全新的模板副本上运行：设置根 id、填充全部字段、
/// 裁剪空节并为必留节填默认句。modify 流程在已有主题上做增量
/// 合并：新增内容插入，重复内容合并 props，已有内容不回退。
///
/// # 错误
/// 根元素不是 `<reference>` 时返回 `InvalidFormat`，该记录按
/// 失败记账，整体运行继续。
pub fn populate_topic(
    doc: &mut XmlDocument,
    record: &ChangeRecord,
    defaults: &SectionDefaults,
) -> Result<PatchOutcome, SyncError> {
    if doc.root.name != "reference" {
        return Err(SyncError::InvalidFormat(format!(
            "主题根元素是 <{}>，预期 <reference>",
            doc.root.name
        )));
    }

    let mode = match record.change_type {
        ChangeType::Create => PatchMode::Create,
        ChangeType::Modify => PatchMode::Modify,
    };
    let plan = plan_for(record.attributes);
    let desc = &record.description;
    let mut outcome = PatchOutcome::default();

    if mode == PatchMode::Create {
        doc.root.set_attr("id", &record.topic_id());
    }

    set_key_references(&mut doc.root, &record.key);
    set_shortdesc(&mut doc.root, desc.shortdesc.as_deref());

    if plan.prototype {
        outcome.absorb(patch_prototype(&mut doc.root, record, mode));
    }
    patch_detailed_desc(&mut doc.root, desc, mode, &mut outcome);
    if plan.parameters {
        outcome.absorb(patch_parameters(&mut doc.root, &desc.dita_params, record, mode));
    }
    if plan.enumerations {
        outcome.absorb(patch_enumerations(&mut doc.root, &desc.enumerations, mode));
    }
    if plan.return_values {
        outcome.absorb(patch_return_values(&mut doc.root, &desc.return_values, mode));
    }

    if mode == PatchMode::Create {
        if plan.optional_sections {
            pruner::fill_or_prune(&mut doc.root, "scenario", desc.scenarios.as_deref());
            pruner::fill_or_prune(&mut doc.root, "related", desc.related.as_deref());
            if desc.dita_params.is_empty() {
                pruner::remove_section(&mut doc.root, "parameters");
            }
        }
        if plan.mandatory_sections {
            pruner::fill_with_default(
                &mut doc.root,
                "timing",
                desc.timing.as_deref(),
                &defaults.timing,
            );
            pruner::fill_with_default(
                &mut doc.root,
                "restriction",
                desc.restrictions.as_deref(),
                &defaults.restriction,
            );
        }
        for section_id in plan.drop_sections {
            pruner::remove_section(&mut doc.root, section_id);
        }
    } else {
        // modify 只覆盖带了新内容的文本节，空节不裁剪
        update_section_text(&mut doc.root, "scenario", desc.scenarios.as_deref());
        update_section_text(&mut doc.root, "timing", desc.timing.as_deref());
        update_section_text(&mut doc.root, "restriction", desc.restrictions.as_deref());
        update_section_text(&mut doc.root, "related", desc.related.as_deref());
    }

    Ok(outcome)
}

/// 设置标题与索引项的 keyref 指向
fn set_key_references(root: &mut Element, key: &str) {
    if let Some(title) = root.descendant_mut(&|el| el.name == "title") {
        match title.first_child_mut("ph") {
            Some(ph) => ph.set_attr("keyref", key),
            None => log::warn!("主题缺少 title/ph，keyref 未设置"),
        }
    } else {
        log::warn!("主题缺少 title，keyref 未设置");
    }
    match root.descendant_mut(&|el| el.name == "indexterm") {
        Some(indexterm) => indexterm.set_attr("keyref", key),
        None => log::warn!("主题缺少 indexterm，keyref 未设置"),
    }
}

/// 设置短描述，优先写入 shortdesc 下的 ph
fn set_shortdesc(root: &mut Element, shortdesc: Option<&str>) {
    let Some(text) = shortdesc else { return };
    if text.trim().is_empty() {
        return;
    }
    let Some(shortdesc_el) = root.descendant_mut(&|el| el.name == "shortdesc") else {
        log::warn!("主题缺少 shortdesc，短描述未写入");
        return;
    };
    let has_ph = shortdesc_el.first_child("ph").is_some();
    if has_ph {
        if let Some(ph) = shortdesc_el.first_child_mut("ph") {
            ph.set_text(text);
        }
    } else {
        shortdesc_el.set_text(text);
    }
}

/// modify 流程的文本节覆盖，节缺失只告警
fn update_section_text(root: &mut Element, section_id: &str, text: Option<&str>) {
    let Some(value) = text else { return };
    if value.trim().is_empty() {
        return;
    }
    if !pruner::set_section_text(root, section_id, value) {
        log::warn!("主题缺少 section '{}'，文本未写入", section_id);
    }
}

/// 填充原型节的代码块
///
/// 插入位置是模板中已有代码块的父容器；create 流程先清掉模板
/// 占位的空代码块。
fn patch_prototype(root: &mut Element, record: &ChangeRecord, mode: PatchMode) -> PatchOutcome {
    let groups = group_values(
        record
            .api_signature
            .iter()
            .map(|(id, sig)| (id.as_str(), sig.as_str())),
    );
    if groups.is_empty() {
        return PatchOutcome::default();
    }
    let Some((section, section_depth)) = root.descendant_with_depth_mut(
        &|el| el.name == "section" && el.attr("id") == Some("prototype"),
        0,
    ) else {
        log::warn!("主题缺少 prototype 节，原型未写入");
        return PatchOutcome::default();
    };

    let container_pred =
        |el: &Element| el.child_elements().any(|child| child.name == "codeblock");
    let placeholder_pred =
        |el: &Element| el.name == "codeblock" && el.text().trim().is_empty();

    if section.descendant(&container_pred).is_some() {
        if let Some((container, depth)) =
            section.descendant_with_depth_mut(&container_pred, section_depth)
        {
            if mode == PatchMode::Create {
                container.remove_child_elements_where(&placeholder_pred);
            }
            return patch_grouped_text(container, depth, "codeblock", &groups, mode);
        }
    }
    if mode == PatchMode::Create {
        section.remove_child_elements_where(&placeholder_pred);
    }
    patch_grouped_text(section, section_depth, "codeblock", &groups, mode)
}

/// 填充详细描述节：引入版本、公共段落、平台专有段落
fn patch_detailed_desc(
    root: &mut Element,
    desc: &Description,
    mode: PatchMode,
    outcome: &mut PatchOutcome,
) {
    let since = desc.detailed_desc.as_ref().and_then(|d| d.since.as_deref());
    let common = desc.detailed_desc.as_ref().and_then(|d| d.desc.as_deref());
    let platform_groups = group_values(
        desc.platform_only_desc
            .iter()
            .map(|(id, text)| (id.as_str(), text.as_str())),
    );
    if since.is_none() && is_blank(common) && platform_groups.is_empty() {
        return;
    }
    let Some((section, depth)) = root.descendant_with_depth_mut(
        &|el| el.name == "section" && el.attr("id") == Some("detailed_desc"),
        0,
    ) else {
        log::warn!("主题缺少 detailed_desc 节");
        return;
    };

    // 引入版本写在 dlentry 的 dd 里，带 v 前缀
    if let Some(since) = since {
        match section.descendant_mut(&|el| el.name == "dd") {
            Some(dd) => dd.set_text(&format!("v{}", since)),
            None => log::warn!("detailed_desc 节缺少版本 dd，since 未写入"),
        }
    }

    if let Some(text) = common {
        if !text.trim().is_empty() {
            let has_paragraph = section.first_child("p").is_some();
            if has_paragraph {
                if let Some(paragraph) = section.first_child_mut("p") {
                    paragraph.set_text(text);
                }
            } else {
                append_child(section, depth, text_element("p", text));
            }
        }
    }

    outcome.absorb(patch_grouped_text(section, depth, "p", &platform_groups, mode));
}

/// 模板占位的空 plentry（无文本也无子元素内容）
fn placeholder_plentry(entry: &Element) -> bool {
    entry.name == "plentry"
        && entry.child_elements().all(|child| {
            child.text().trim().is_empty() && child.child_elements().next().is_none()
        })
}

/// 填充参数节
///
/// 新参数构造完整 plentry；已有参数 create 流程跳过，modify 流程
/// 合并 plentry 的 props 并补写平台专有名称与描述。
fn patch_parameters(
    root: &mut Element,
    params: &[ParamSpec],
    record: &ChangeRecord,
    mode: PatchMode,
) -> PatchOutcome {
    let mut outcome = PatchOutcome::default();
    if params.is_empty() {
        return outcome;
    }
    let Some((section, section_depth)) = root.descendant_with_depth_mut(
        &|el| el.name == "section" && el.attr("id") == Some("parameters"),
        0,
    ) else {
        log::warn!("主题缺少 parameters 节，参数未写入");
        return outcome;
    };

    if section.first_child("parml").is_none() {
        append_child(section, section_depth, Element::new("parml"));
    }
    let Some((parml, parml_depth)) =
        section.descendant_with_depth_mut(&|el| el.name == "parml", section_depth)
    else {
        return outcome;
    };
    if mode == PatchMode::Create {
        parml.remove_child_elements_where(&placeholder_plentry);
    }

    for param in params {
        let name = param.name.trim();
        if name.is_empty() {
            log::warn!("参数缺少名称，已跳过");
            continue;
        }
        let platforms = if param.platforms.is_empty() {
            record.platform_set()
        } else {
            PlatformSet::resolve_ids(param.platforms.iter().map(String::as_str))
        };
        let name_groups = group_values(
            param
                .platform_only_name
                .iter()
                .map(|(id, text)| (id.as_str(), text.as_str())),
        );
        let desc_groups = group_values(
            param
                .platform_only_desc
                .iter()
                .map(|(id, text)| (id.as_str(), text.as_str())),
        );

        let exists = find_plentry(parml, name).is_some();
        if exists {
            if let Some(entry) = find_plentry(parml, name) {
                match mode {
                    PatchMode::Create => {
                        log::debug!("参数已存在，跳过: {}", name);
                        outcome.skipped += 1;
                    }
                    PatchMode::Modify => {
                        if merge_element_props(entry, platforms) {
                            outcome.merged += 1;
                        } else {
                            outcome.skipped += 1;
                        }
                        let entry_depth = parml_depth + 1;
                        outcome.absorb(patch_grouped_text(entry, entry_depth, "pt", &name_groups, mode));
                        outcome.absorb(patch_grouped_text(entry, entry_depth, "pd", &desc_groups, mode));
                    }
                }
            }
        } else {
            let entry_depth = parml_depth + 1;
            let mut entry = Element::new("plentry");
            if !platforms.is_empty() {
                entry.set_attr("props", &platforms.props());
            }
            append_child(&mut entry, entry_depth, text_element("pt", name));
            for group in &name_groups {
                append_child(
                    &mut entry,
                    entry_depth,
                    props_text_element("pt", &group.value, &group.props()),
                );
            }
            if !param.desc.trim().is_empty() {
                append_child(&mut entry, entry_depth, text_element("pd", &param.desc));
            }
            for group in &desc_groups {
                append_child(
                    &mut entry,
                    entry_depth,
                    props_text_element("pd", &group.value, &group.props()),
                );
            }
            append_child(parml, parml_depth, entry);
            outcome.inserted += 1;
        }
    }
    outcome
}

/// 填充枚举值节
///
/// 值条目按跨平台别名归组：pt 按具体值名分组渲染，pd 按描述
/// 分组渲染。create 流程只渲染 change_type 为 create 的值。
fn patch_enumerations(
    root: &mut Element,
    enumerations: &IndexMap<String, Vec<EnumValueSpec>>,
    mode: PatchMode,
) -> PatchOutcome {
    let mut outcome = PatchOutcome::default();
    if enumerations.is_empty() {
        return outcome;
    }

    let mut items: Vec<(Platform, &EnumValueSpec)> = Vec::new();
    for (id, values) in enumerations {
        let Some(platform) = Platform::resolve(id) else {
            log::warn!("未知平台标识 '{}'，枚举值已忽略", id);
            continue;
        };
        for value in values {
            items.push((platform, value));
        }
    }

    let Some((section, section_depth)) = root.descendant_with_depth_mut(
        &|el| el.name == "section" && el.attr("id") == Some("parameters"),
        0,
    ) else {
        log::warn!("主题缺少 parameters 节，枚举值未写入");
        return outcome;
    };
    if section.first_child("parml").is_none() {
        append_child(section, section_depth, Element::new("parml"));
    }
    let Some((parml, parml_depth)) =
        section.descendant_with_depth_mut(&|el| el.name == "parml", section_depth)
    else {
        return outcome;
    };
    if mode == PatchMode::Create {
        parml.remove_child_elements_where(&placeholder_plentry);
    }

    let relevant: Vec<(Platform, &EnumValueSpec)> = items
        .into_iter()
        .filter(|(_, value)| {
            mode == PatchMode::Modify || value.change_type == ChangeType::Create
        })
        .collect();

    for group in group_by_key(relevant, |value| value.alias.as_str()) {
        let value_names: Vec<&str> = group.items.iter().map(|(_, v)| v.value.as_str()).collect();
        let pt_groups = group_values(
            group
                .items
                .iter()
                .map(|(platform, value)| (platform.id(), value.value.as_str())),
        );
        let pd_groups = group_values(
            group
                .items
                .iter()
                .filter(|(_, value)| !value.desc.trim().is_empty())
                .map(|(platform, value)| (platform.id(), value.desc.as_str())),
        );

        let exists = find_plentry_by_values(parml, &value_names).is_some();
        if exists {
            if let Some(entry) = find_plentry_by_values(parml, &value_names) {
                match mode {
                    PatchMode::Create => {
                        log::debug!("枚举值已存在，跳过: {}", group.key);
                        outcome.skipped += 1;
                    }
                    PatchMode::Modify => {
                        let entry_depth = parml_depth + 1;
                        outcome.absorb(patch_grouped_text(entry, entry_depth, "pt", &pt_groups, mode));
                        outcome.absorb(patch_grouped_text(entry, entry_depth, "pd", &pd_groups, mode));
                    }
                }
            }
        } else {
            let entry_depth = parml_depth + 1;
            let mut entry = Element::new("plentry");
            for value_group in &pt_groups {
                append_child(
                    &mut entry,
                    entry_depth,
                    props_text_element("pt", &value_group.value, &value_group.props()),
                );
            }
            for desc_group in &pd_groups {
                append_child(
                    &mut entry,
                    entry_depth,
                    props_text_element("pd", &desc_group.value, &desc_group.props()),
                );
            }
            append_child(parml, parml_depth, entry);
            outcome.inserted += 1;
        }
    }
    outcome
}

/// 填充返回值节的列表项
fn patch_return_values(
    root: &mut Element,
    return_values: &IndexMap<String, String>,
    mode: PatchMode,
) -> PatchOutcome {
    let groups = group_values(
        return_values
            .iter()
            .map(|(id, text)| (id.as_str(), text.as_str())),
    );
    if groups.is_empty() {
        return PatchOutcome::default();
    }
    let Some((section, section_depth)) = root.descendant_with_depth_mut(
        &|el| el.name == "section" && el.attr("id") == Some("return_values"),
        0,
    ) else {
        // 回调模板没有返回值节，静默跳过
        log::debug!("主题缺少 return_values 节，返回值未写入");
        return PatchOutcome::default();
    };
    let Some((list, list_depth)) =
        section.descendant_with_depth_mut(&|el| el.name == "ul", section_depth)
    else {
        log::warn!("return_values 节缺少 ul 列表，返回值未写入");
        return PatchOutcome::default();
    };
    patch_grouped_text(list, list_depth, "li", &groups, mode)
}
