use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::CampaignError;
use crate::ledger::{
    Campaign, Invitation, InvitationAction, InvitationStatus, Invitee, Member, UserId, UserRef,
};

use super::ServiceResult;

/// Roster and invitation rules for a campaign.
pub struct MembershipRegistry;

impl MembershipRegistry {
    pub fn add_member(
        campaign: &mut Campaign,
        user: UserRef,
        is_admin: bool,
        now: DateTime<Utc>,
    ) -> ServiceResult<()> {
        if let Some(max) = campaign.max_members {
            if campaign.members.len() >= max as usize {
                return Err(CampaignError::CampaignFull { max });
            }
        }
        if campaign.is_member(&user.id) {
            return Err(CampaignError::DuplicateMember(user.id));
        }

        tracing::info!(campaign = %campaign.id, member = %user.id, is_admin, "member added");
        campaign.members.push(Member::new(user, is_admin, now));
        campaign.touch();
        Ok(())
    }

    /// Drops a member and frees the month it held.
    ///
    /// With `guard_last_admin` set, the only admin of a campaign that still
    /// has other members cannot be removed.
    pub fn remove_member(
        campaign: &mut Campaign,
        member_id: &UserId,
        guard_last_admin: bool,
    ) -> ServiceResult<Member> {
        let index = campaign
            .member_index(member_id)
            .ok_or_else(|| CampaignError::UnknownMember(member_id.clone()))?;
        let leaves_no_admin = campaign.members[index].is_admin && campaign.admin_count() == 1;
        if guard_last_admin && leaves_no_admin && campaign.members.len() > 1 {
            return Err(CampaignError::LastAdminRemoval);
        }

        let removed = campaign.members.remove(index);
        campaign.touch();
        tracing::info!(
            campaign = %campaign.id,
            member = %member_id,
            freed = ?removed.allocated_month.map(|m| m.to_string()),
            "member removed"
        );
        Ok(removed)
    }

    pub fn is_admin(campaign: &Campaign, user_id: &UserId) -> bool {
        campaign.member(user_id).map_or(false, |member| member.is_admin)
    }

    /// Room left for another invitation once pending ones are counted.
    pub fn can_invite(campaign: &Campaign) -> bool {
        campaign.max_members.map_or(true, |max| {
            campaign.members.len() + campaign.pending_invitation_count() < max as usize
        })
    }

    pub fn invite(
        campaign: &mut Campaign,
        by: &UserId,
        invitee: Invitee,
        now: DateTime<Utc>,
    ) -> ServiceResult<Invitation> {
        if !Self::is_admin(campaign, by) {
            return Err(CampaignError::NotAuthorized {
                user: by.clone(),
                action: "invite members",
            });
        }
        if !Self::can_invite(campaign) {
            return Err(CampaignError::CampaignFull {
                max: campaign.max_members.unwrap_or_default(),
            });
        }
        if campaign.members.iter().any(|member| invitee.matches(&member.user)) {
            return Err(CampaignError::AlreadyMember(invitee.to_string()));
        }
        if campaign
            .invitations
            .iter()
            .any(|existing| existing.is_pending() && existing.invitee.same_target(&invitee))
        {
            return Err(CampaignError::AlreadyInvited(invitee.to_string()));
        }

        let invitation = Invitation::new(campaign.id, invitee, by.clone(), now);
        campaign.invitations.push(invitation.clone());
        campaign.touch();
        tracing::info!(
            campaign = %campaign.id,
            invitation = %invitation.id,
            invitee = %invitation.invitee,
            "invitation sent"
        );
        Ok(invitation)
    }

    /// Accepts or declines a pending invitation on behalf of `responder`.
    pub fn respond_to_invitation(
        campaign: &mut Campaign,
        invitation_id: Uuid,
        action: InvitationAction,
        responder: &UserRef,
        now: DateTime<Utc>,
    ) -> ServiceResult<Invitation> {
        let invitation = campaign
            .invitation(invitation_id)
            .ok_or(CampaignError::UnknownInvitation(invitation_id))?;
        if !invitation.is_pending() {
            return Err(CampaignError::InvalidState(format!(
                "invitation {} is {:?}, not pending",
                invitation.id, invitation.status
            )));
        }
        if !invitation.invitee.matches(responder) {
            return Err(CampaignError::NotAuthorized {
                user: responder.id.clone(),
                action: "respond to this invitation",
            });
        }

        let status = match action {
            InvitationAction::Accept => {
                Self::add_member(campaign, responder.clone(), false, now)?;
                InvitationStatus::Accepted
            }
            InvitationAction::Decline => InvitationStatus::Declined,
        };
        Self::close_invitation(campaign, invitation_id, status, now)
    }

    pub fn cancel_invitation(
        campaign: &mut Campaign,
        invitation_id: Uuid,
        now: DateTime<Utc>,
    ) -> ServiceResult<Invitation> {
        Self::close_invitation(campaign, invitation_id, InvitationStatus::Cancelled, now)
    }

    pub fn pending_invitations(campaign: &Campaign) -> Vec<&Invitation> {
        campaign
            .invitations
            .iter()
            .filter(|invitation| invitation.is_pending())
            .collect()
    }

    fn close_invitation(
        campaign: &mut Campaign,
        invitation_id: Uuid,
        status: InvitationStatus,
        now: DateTime<Utc>,
    ) -> ServiceResult<Invitation> {
        let invitation = campaign
            .invitation_mut(invitation_id)
            .ok_or(CampaignError::UnknownInvitation(invitation_id))?;
        invitation.close(status, now)?;
        let closed = invitation.clone();
        campaign.touch();
        tracing::info!(invitation = %invitation_id, ?status, "invitation closed");
        Ok(closed)
    }
}
