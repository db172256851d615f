// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The `GatewayOperation.type` ↔ body-record registry.
//!
//! The original binds a runtime integer-keyed table to concrete record
//! types; here the registry is a tagged variant whose encode/decode methods
//! dispatch on the tag, so encode and decode are two halves of one
//! exhaustive match rather than a lookup into a map that could miss an
//! entry at runtime.

use prost::Message;

use crate::{error::BridgeError, proto, proto::gateway_operation::OperationType};

macro_rules! body_kind {
    ($( $op:ident => $variant:ident : $ty:path ),+ $(,)?) => {
        /// A decoded `GatewayOperation` body, tagged by its registered
        /// operation type.
        #[derive(Debug, Clone, PartialEq)]
        #[allow(clippy::large_enum_variant)]
        pub enum BodyKind {
            /// `NoOperation`: a bare `cmd` with no accompanying body.
            Empty,
            $( $variant($ty), )+
        }

        impl BodyKind {
            /// The registry type this body was (or will be) framed under.
            pub fn operation_type(&self) -> OperationType {
                match self {
                    BodyKind::Empty => OperationType::NoOperation,
                    $( BodyKind::$variant(_) => OperationType::$op, )+
                }
            }

            /// Encodes the inner protobuf record to its raw bytes.
            pub fn encode_to_vec(&self) -> Vec<u8> {
                match self {
                    BodyKind::Empty => Vec::new(),
                    $( BodyKind::$variant(m) => m.encode_to_vec(), )+
                }
            }

            /// Decodes `buf` as the body registered for `operation_type`.
            pub fn decode(operation_type: OperationType, buf: &[u8]) -> Result<Self, BridgeError> {
                Ok(match operation_type {
                    OperationType::NoOperation => BodyKind::Empty,
                    $(
                        OperationType::$op => BodyKind::$variant(
                            <$ty>::decode(buf).map_err(|e| BridgeError::DecodeError(e.to_string()))?
                        ),
                    )+
                })
            }
        }
    };
}

body_kind! {
    SetAddressRequestType => SetAddressRequest: proto::SetAddressRequest,
    RegisterAppRequestType => RegisterAppRequest: proto::RegisterAppRequest,
    StartSessionRequestType => StartSessionRequest: proto::StartSessionRequest,
    CloseSessionRequestType => CloseSessionRequest: proto::CloseSessionRequest,
    ListRegisteredAppsRequestType => ListRegisteredAppsRequest: proto::ListRegisteredAppsRequest,
    DeregisterAppRequestType => DeregisterAppRequest: proto::DeregisterAppRequest,
    ChangePinRequestType => ChangePinRequest: proto::ChangePinRequest,
    GetRemoteAccessIdRequestType => GetRemoteAccessIdRequest: proto::GetRemoteAccessIdRequest,
    SetRemoteAccessIdRequestType => SetRemoteAccessIdRequest: proto::SetRemoteAccessIdRequest,
    GetSupportIdRequestType => GetSupportIdRequest: proto::GetSupportIdRequest,
    SetSupportIdRequestType => SetSupportIdRequest: proto::SetSupportIdRequest,
    GetWebIdRequestType => GetWebIdRequest: proto::GetWebIdRequest,
    SetWebIdRequestType => SetWebIdRequest: proto::SetWebIdRequest,
    SetPushIdRequestType => SetPushIdRequest: proto::SetPushIdRequest,
    DebugRequestType => DebugRequest: proto::DebugRequest,
    UpgradeRequestType => UpgradeRequest: proto::UpgradeRequest,
    SetDeviceSettingsRequestType => SetDeviceSettingsRequest: proto::SetDeviceSettingsRequest,
    VersionRequestType => VersionRequest: proto::VersionRequest,

    SetAddressConfirmType => SetAddressConfirm: proto::SetAddressConfirm,
    RegisterAppConfirmType => RegisterAppConfirm: proto::RegisterAppConfirm,
    StartSessionConfirmType => StartSessionConfirm: proto::StartSessionConfirm,
    CloseSessionConfirmType => CloseSessionConfirm: proto::CloseSessionConfirm,
    ListRegisteredAppsConfirmType => ListRegisteredAppsConfirm: proto::ListRegisteredAppsConfirm,
    DeregisterAppConfirmType => DeregisterAppConfirm: proto::DeregisterAppConfirm,
    ChangePinConfirmType => ChangePinConfirm: proto::ChangePinConfirm,
    GetRemoteAccessIdConfirmType => GetRemoteAccessIdConfirm: proto::GetRemoteAccessIdConfirm,
    SetRemoteAccessIdConfirmType => SetRemoteAccessIdConfirm: proto::SetRemoteAccessIdConfirm,
    GetSupportIdConfirmType => GetSupportIdConfirm: proto::GetSupportIdConfirm,
    SetSupportIdConfirmType => SetSupportIdConfirm: proto::SetSupportIdConfirm,
    GetWebIdConfirmType => GetWebIdConfirm: proto::GetWebIdConfirm,
    SetWebIdConfirmType => SetWebIdConfirm: proto::SetWebIdConfirm,
    SetPushIdConfirmType => SetPushIdConfirm: proto::SetPushIdConfirm,
    DebugConfirmType => DebugConfirm: proto::DebugConfirm,
    UpgradeConfirmType => UpgradeConfirm: proto::UpgradeConfirm,
    SetDeviceSettingsConfirmType => SetDeviceSettingsConfirm: proto::SetDeviceSettingsConfirm,
    VersionConfirmType => VersionConfirm: proto::VersionConfirm,

    GatewayNotificationType => GatewayNotification: proto::GatewayNotification,
    KeepAliveType => KeepAlive: proto::KeepAlive,
    FactoryResetType => FactoryReset: proto::FactoryReset,

    CnTimeRequestType => CnTimeRequest: proto::CnTimeRequest,
    CnTimeConfirmType => CnTimeConfirm: proto::CnTimeConfirm,
    CnNodeRequestType => CnNodeRequest: proto::CnNodeRequest,
    CnNodeNotificationType => CnNodeNotification: proto::CnNodeNotification,
    CnRmiRequestType => CnRmiRequest: proto::CnRmiRequest,
    CnRmiResponseType => CnRmiResponse: proto::CnRmiResponse,
    CnRmiAsyncRequestType => CnRmiAsyncRequest: proto::CnRmiAsyncRequest,
    CnRmiAsyncConfirmType => CnRmiAsyncConfirm: proto::CnRmiAsyncConfirm,
    CnRmiAsyncResponseType => CnRmiAsyncResponse: proto::CnRmiAsyncResponse,
    CnRpdoRequestType => CnRpdoRequest: proto::CnRpdoRequest,
    CnRpdoConfirmType => CnRpdoConfirm: proto::CnRpdoConfirm,
    CnRpdoNotificationType => CnRpdoNotification: proto::CnRpdoNotification,
    CnAlarmNotificationType => CnAlarmNotification: proto::CnAlarmNotification,

    CnFupReadRegisterRequestType => CnFupReadRegisterRequest: proto::CnFupReadRegisterRequest,
    CnFupReadRegisterConfirmType => CnFupReadRegisterConfirm: proto::CnFupReadRegisterConfirm,
    CnFupProgramBeginRequestType => CnFupProgramBeginRequest: proto::CnFupProgramBeginRequest,
    CnFupProgramBeginConfirmType => CnFupProgramBeginConfirm: proto::CnFupProgramBeginConfirm,
    CnFupProgramRequestType => CnFupProgramRequest: proto::CnFupProgramRequest,
    CnFupProgramConfirmType => CnFupProgramConfirm: proto::CnFupProgramConfirm,
    CnFupProgramEndRequestType => CnFupProgramEndRequest: proto::CnFupProgramEndRequest,
    CnFupProgramEndConfirmType => CnFupProgramEndConfirm: proto::CnFupProgramEndConfirm,
    CnFupReadRequestType => CnFupReadRequest: proto::CnFupReadRequest,
    CnFupReadConfirmType => CnFupReadConfirm: proto::CnFupReadConfirm,
    CnFupResetRequestType => CnFupResetRequest: proto::CnFupResetRequest,
    CnFupResetConfirmType => CnFupResetConfirm: proto::CnFupResetConfirm,
    CnWhoAmIRequestType => CnWhoAmIRequest: proto::CnWhoAmIRequest,
    CnWhoAmIConfirmType => CnWhoAmIConfirm: proto::CnWhoAmIConfirm,

    WiFiSettingsRequestType => WiFiSettingsRequest: proto::WiFiSettingsRequest,
    WiFiSettingsConfirmType => WiFiSettingsConfirm: proto::WiFiSettingsConfirm,
    WiFiNetworksRequestType => WiFiNetworksRequest: proto::WiFiNetworksRequest,
    WiFiNetworksConfirmType => WiFiNetworksConfirm: proto::WiFiNetworksConfirm,
    WiFiJoinNetworkRequestType => WiFiJoinNetworkRequest: proto::WiFiJoinNetworkRequest,
    WiFiJoinNetworkConfirmType => WiFiJoinNetworkConfirm: proto::WiFiJoinNetworkConfirm,
}
